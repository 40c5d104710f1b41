use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, round2, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{Percent, RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct MarketInput {
    #[serde(default)]
    trends: Vec<TrendInput>,
    #[serde(default)]
    hot_items: Vec<HotItemInput>,
}

#[derive(Debug, Deserialize)]
struct TrendInput {
    id: Option<u32>,
    item_name: String,
    price: i64,
    change: f64,
    volume: u64,
    #[serde(default)]
    history: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct HotItemInput {
    id: Option<u32>,
    item_name: String,
    price: i64,
    trade_count: u64,
    hotness: Percent,
}

#[derive(Debug, Serialize)]
struct MarketTrends {
    trends: Vec<Trend>,
    hot_items: Vec<HotItem>,
}

#[derive(Debug, Serialize)]
struct Trend {
    id: u32,
    item_name: String,
    price: i64,
    change: f64,
    volume: u64,
    history: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct HotItem {
    id: u32,
    item_name: String,
    price: i64,
    trade_count: u64,
    hotness: Percent,
}

pub struct MarketTrendsDeriver;

impl SectionDeriver for MarketTrendsDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::MarketTrends
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(input) = read_island::<MarketInput>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        // trends and hot items are separate lists; ids only need to be unique within each
        let trend_ids = assign_ids(key, input.trends.iter().map(|t| t.id))?;
        let trends = input
            .trends
            .into_iter()
            .zip(trend_ids)
            .map(|(t, id)| Trend {
                id,
                item_name: t.item_name,
                price: t.price,
                change: round2(t.change),
                volume: t.volume,
                history: t.history.into_iter().map(round2).collect(),
            })
            .collect();

        let hot_ids = assign_ids(key, input.hot_items.iter().map(|h| h.id))?;
        let hot_items = input
            .hot_items
            .into_iter()
            .zip(hot_ids)
            .map(|(h, id)| HotItem {
                id,
                item_name: h.item_name,
                price: h.price,
                trade_count: h.trade_count,
                hotness: h.hotness,
            })
            .collect();

        Derived::fresh(key, &MarketTrends { trends, hot_items })
    }
}
