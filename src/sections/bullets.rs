use serde::{Deserialize, Serialize};

use super::{assign_ids, price_diff, ratio_percent, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct BulletInput {
    id: Option<u32>,
    bullet_type: String,
    buy_price: i64,
    sell_price: i64,
    demand: String,
}

#[derive(Debug, Serialize)]
struct BulletPrice {
    id: u32,
    bullet_type: String,
    buy_price: i64,
    sell_price: i64,
    price_diff: i64,
    profit_margin: f64,
    demand: String,
}

pub struct BulletPriceDiffDeriver;

impl SectionDeriver for BulletPriceDiffDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::BulletPriceDiff
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<BulletInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let bullets = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| -> Result<BulletPrice, DeriveError> {
                let diff = price_diff(key, id, r.buy_price, r.sell_price)?;
                Ok(BulletPrice {
                    id,
                    profit_margin: ratio_percent(key, id, diff, r.buy_price)?,
                    price_diff: diff,
                    bullet_type: r.bullet_type,
                    buy_price: r.buy_price,
                    sell_price: r.sell_price,
                    demand: r.demand,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Derived::fresh(key, &bullets)
    }
}
