//! # Section derivers
//!
//! One deriver per section key in the data document. Each maps the fetched
//! page (or its absence) to the JSON value stored under its key.
//!
//! ## Page convention
//! A section's source rows live in an embedded JSON island:
//!
//! ```text
//! <script type="application/json" data-section="workbench_profit">
//!   [{ "recipe_name": "高级护甲", "cost": 50000, "sell_price": 75000, "craft_time": 45 }]
//! </script>
//! ```
//!
//! Derivers deserialize those rows, assign ids where the page omits them, and
//! compute the derived fields (price differences, margins, labels).
//!
//! ## Failure model
//! - Page unavailable: the empty section shape, flagged `degraded`.
//! - Page present but the island is missing or malformed: [`DeriveError`],
//!   and the orchestrator keeps the previous value for the key.
//! - Derivers hold no state and never see each other's output.

mod bosses;
mod bullets;
mod map_points;
mod market;
mod missions;
mod news;
mod restock;
mod weapon_codes;
mod workbench;

pub use bosses::BossSpawnsDeriver;
pub use bullets::BulletPriceDiffDeriver;
pub use map_points::MapPointsDeriver;
pub use market::MarketTrendsDeriver;
pub use missions::S4MissionsDeriver;
pub use news::NewsDeriver;
pub use restock::RestockPredictionDeriver;
pub use weapon_codes::WeaponCodesDeriver;
pub use workbench::WorkbenchProfitDeriver;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DeriveError;
use crate::types::{RawContent, SectionKey};

pub trait SectionDeriver: Send + Sync {
    fn key(&self) -> SectionKey;
    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError>;
}

/// A deriver's output for its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub value: Value,
    /// Built without source data.
    pub degraded: bool,
}

impl Derived {
    pub fn fresh<T: Serialize>(key: SectionKey, record: &T) -> Result<Self, DeriveError> {
        let value = serde_json::to_value(record).map_err(|source| DeriveError::Encode { key, source })?;
        Ok(Self {
            value,
            degraded: false,
        })
    }

    /// The empty section shape. The document carries no marker for this;
    /// callers see it in the run log and [`crate::UpdateReport::degraded`].
    pub fn degraded(key: SectionKey) -> Self {
        Self {
            value: key.empty_record(),
            degraded: true,
        }
    }
}

/// Exactly one deriver for every [`SectionKey`].
#[derive(Clone)]
pub struct DeriverSet {
    derivers: BTreeMap<SectionKey, Arc<dyn SectionDeriver>>,
}

impl DeriverSet {
    pub fn standard() -> Self {
        let all: [Arc<dyn SectionDeriver>; 9] = [
            Arc::new(MarketTrendsDeriver),
            Arc::new(NewsDeriver),
            Arc::new(WeaponCodesDeriver),
            Arc::new(MapPointsDeriver),
            Arc::new(BulletPriceDiffDeriver),
            Arc::new(WorkbenchProfitDeriver),
            Arc::new(RestockPredictionDeriver),
            Arc::new(S4MissionsDeriver),
            Arc::new(BossSpawnsDeriver),
        ];
        Self {
            derivers: all.into_iter().map(|d| (d.key(), d)).collect(),
        }
    }

    /// Swap in a different deriver for the key it reports.
    #[must_use]
    pub fn with(mut self, deriver: impl SectionDeriver + 'static) -> Self {
        self.derivers.insert(deriver.key(), Arc::new(deriver));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, &Arc<dyn SectionDeriver>)> {
        self.derivers.iter().map(|(k, d)| (*k, d))
    }

    pub fn len(&self) -> usize {
        self.derivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }
}

impl Default for DeriverSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Text of the section's JSON island.
fn section_island(html: &str, key: SectionKey) -> Result<String, DeriveError> {
    let doc = Html::parse_document(html);
    let css = format!(r#"script[type="application/json"][data-section="{key}"]"#);
    let sel = Selector::parse(&css).map_err(|e| DeriveError::Selector {
        key,
        message: format!("{e:?}"),
    })?;

    doc.select(&sel)
        .next()
        .map(|n| n.text().collect::<String>())
        .ok_or(DeriveError::MissingSection { key })
}

/// Source rows for `key`, or `None` when there is no page at all.
pub(crate) fn read_island<T: DeserializeOwned>(
    raw: &RawContent,
    key: SectionKey,
) -> Result<Option<T>, DeriveError> {
    let Some(html) = raw.body() else {
        return Ok(None);
    };
    let text = section_island(html, key)?;
    serde_json::from_str(text.trim())
        .map(Some)
        .map_err(|source| DeriveError::Malformed { key, source })
}

/// Ids as given by the page, else 1-based position. Must be unique.
pub(crate) fn assign_ids<I>(key: SectionKey, given: I) -> Result<Vec<u32>, DeriveError>
where
    I: IntoIterator<Item = Option<u32>>,
{
    let mut seen = HashSet::new();
    given
        .into_iter()
        .zip(1u32..)
        .map(|(id, position)| {
            let id = id.unwrap_or(position);
            if seen.insert(id) {
                Ok(id)
            } else {
                Err(DeriveError::DuplicateId { key, id })
            }
        })
        .collect()
}

/// Two decimals. Values too large to scale have no fraction left to round.
pub(crate) fn round2(v: f64) -> f64 {
    let scaled = v * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        v
    }
}

/// `a - b`, or [`DeriveError::Overflow`] if it does not fit.
pub(crate) fn checked_diff(key: SectionKey, id: u32, a: i64, b: i64) -> Result<i64, DeriveError> {
    a.checked_sub(b).ok_or(DeriveError::Overflow { key, id })
}

/// `numerator / denominator * 100`, two decimals.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio_percent(
    key: SectionKey,
    id: u32,
    numerator: i64,
    denominator: i64,
) -> Result<f64, DeriveError> {
    if denominator == 0 {
        return Err(DeriveError::ZeroDenominator { key, id });
    }
    Ok(round2(numerator as f64 / denominator as f64 * 100.0))
}

/// `(sell - cost) / cost * 100`, two decimals.
pub(crate) fn profit_margin(key: SectionKey, id: u32, sell: i64, cost: i64) -> Result<f64, DeriveError> {
    ratio_percent(key, id, checked_diff(key, id, sell, cost)?, cost)
}

pub(crate) fn price_diff(key: SectionKey, id: u32, buy: i64, sell: i64) -> Result<i64, DeriveError> {
    checked_diff(key, id, buy, sell)
}
