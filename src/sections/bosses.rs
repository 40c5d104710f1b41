use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{Percent, RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct BossInput {
    boss_id: Option<u32>,
    boss_name: String,
    map: String,
    spawn_rate: Percent,
    #[serde(default)]
    locations: Vec<LocationInput>,
    #[serde(default)]
    drops: Vec<BossDrop>,
}

#[derive(Debug, Deserialize)]
struct LocationInput {
    location_id: Option<u32>,
    name: String,
    #[serde(default)]
    description: String,
    spawn_probability: Percent,
    guards: u32,
    difficulty: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct BossDrop {
    item: String,
    drop_rate: Percent,
    value: i64,
}

#[derive(Debug, Serialize)]
struct Boss {
    boss_id: u32,
    boss_name: String,
    map: String,
    spawn_rate: Percent,
    locations: Vec<Location>,
    drops: Vec<BossDrop>,
}

#[derive(Debug, Serialize)]
struct Location {
    location_id: u32,
    name: String,
    description: String,
    spawn_probability: Percent,
    guards: u32,
    difficulty: String,
}

pub struct BossSpawnsDeriver;

impl SectionDeriver for BossSpawnsDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::BossSpawns
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<BossInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let boss_ids = assign_ids(key, rows.iter().map(|b| b.boss_id))?;
        let mut bosses = Vec::with_capacity(rows.len());
        for (b, boss_id) in rows.into_iter().zip(boss_ids) {
            let location_ids = assign_ids(key, b.locations.iter().map(|l| l.location_id))?;
            let locations = b
                .locations
                .into_iter()
                .zip(location_ids)
                .map(|(l, location_id)| Location {
                    location_id,
                    description: if l.description.is_empty() {
                        format!("{}的刷新点位", b.map)
                    } else {
                        l.description
                    },
                    name: l.name,
                    spawn_probability: l.spawn_probability,
                    guards: l.guards,
                    difficulty: l.difficulty,
                })
                .collect();

            bosses.push(Boss {
                boss_id,
                boss_name: b.boss_name,
                map: b.map,
                spawn_rate: b.spawn_rate,
                locations,
                drops: b.drops,
            });
        }

        Derived::fresh(key, &bosses)
    }
}
