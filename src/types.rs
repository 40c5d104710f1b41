use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DeriveError;

/// The persisted data document: section name -> section value.
pub type Document = Map<String, Value>;

pub const LAST_UPDATED_KEY: &str = "last_updated";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of the single upstream fetch. Either the whole body or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawContent {
    Body(String),
    Unavailable { reason: String },
}

impl RawContent {
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Body(body) => Some(body),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Body(_))
    }
}

/// The closed set of sections the updater owns in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKey {
    MarketTrends,
    News,
    WeaponCodes,
    MapPoints,
    BulletPriceDiff,
    WorkbenchProfit,
    RestockPrediction,
    S4Missions,
    BossSpawns,
}

impl SectionKey {
    pub const ALL: [Self; 9] = [
        Self::MarketTrends,
        Self::News,
        Self::WeaponCodes,
        Self::MapPoints,
        Self::BulletPriceDiff,
        Self::WorkbenchProfit,
        Self::RestockPrediction,
        Self::S4Missions,
        Self::BossSpawns,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketTrends => "market_trends",
            Self::News => "news",
            Self::WeaponCodes => "weapon_codes",
            Self::MapPoints => "map_points",
            Self::BulletPriceDiff => "bullet_price_diff",
            Self::WorkbenchProfit => "workbench_profit",
            Self::RestockPrediction => "restock_prediction",
            Self::S4Missions => "s4_missions",
            Self::BossSpawns => "boss_spawns",
        }
    }

    /// Empty shape of the section, written when nothing better is available.
    pub fn empty_record(self) -> Value {
        match self {
            Self::MarketTrends => json!({ "trends": [], "hot_items": [] }),
            _ => json!([]),
        }
    }

    /// Field names holding percentages in this section's records.
    pub const fn percent_fields(self) -> &'static [&'static str] {
        match self {
            Self::MarketTrends => &["hotness"],
            Self::WeaponCodes => &["effectiveness"],
            Self::RestockPrediction => &["restock_probability"],
            Self::S4Missions => &["progress"],
            Self::BossSpawns => &["spawn_rate", "spawn_probability", "drop_rate"],
            Self::News | Self::MapPoints | Self::BulletPriceDiff | Self::WorkbenchProfit => &[],
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An integer percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Percent {
    type Error = DeriveError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(DeriveError::PercentOutOfRange(value)),
        }
    }
}

impl From<Percent> for u8 {
    fn from(p: Percent) -> Self {
        p.0
    }
}
