use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{Percent, RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct RestockInput {
    id: Option<u32>,
    item_name: String,
    current_stock: u32,
    /// Hours until the next restock.
    restock_time: u32,
    restock_probability: Percent,
    next_restock: Option<String>,
    demand_level: String,
}

#[derive(Debug, Serialize)]
struct RestockForecast {
    id: u32,
    item_name: String,
    current_stock: u32,
    restock_time: u32,
    restock_probability: Percent,
    next_restock: String,
    demand_level: String,
}

pub struct RestockPredictionDeriver;

impl SectionDeriver for RestockPredictionDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::RestockPrediction
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<RestockInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let forecasts: Vec<RestockForecast> = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| RestockForecast {
                id,
                next_restock: r
                    .next_restock
                    .unwrap_or_else(|| format!("{}小时后", r.restock_time)),
                item_name: r.item_name,
                current_stock: r.current_stock,
                restock_time: r.restock_time,
                restock_probability: r.restock_probability,
                demand_level: r.demand_level,
            })
            .collect();

        Derived::fresh(key, &forecasts)
    }
}
