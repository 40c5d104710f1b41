use serde::{Deserialize, Serialize};

use super::{assign_ids, checked_diff, profit_margin, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct RecipeInput {
    id: Option<u32>,
    recipe_name: String,
    cost: i64,
    sell_price: i64,
    /// Minutes.
    craft_time: u32,
}

#[derive(Debug, Serialize)]
struct RecipeProfit {
    id: u32,
    recipe_name: String,
    cost: i64,
    sell_price: i64,
    profit: i64,
    profit_margin: f64,
    craft_time: u32,
}

pub struct WorkbenchProfitDeriver;

impl SectionDeriver for WorkbenchProfitDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::WorkbenchProfit
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<RecipeInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let recipes = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| -> Result<RecipeProfit, DeriveError> {
                let profit = checked_diff(key, id, r.sell_price, r.cost)?;
                Ok(RecipeProfit {
                    id,
                    profit,
                    profit_margin: profit_margin(key, id, r.sell_price, r.cost)?,
                    recipe_name: r.recipe_name,
                    cost: r.cost,
                    sell_price: r.sell_price,
                    craft_time: r.craft_time,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Derived::fresh(key, &recipes)
    }
}
