use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{Percent, RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct MissionInput {
    id: Option<u32>,
    mission_name: String,
    reward: i64,
    difficulty: String,
    progress: Percent,
    status: String,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct Mission {
    id: u32,
    mission_name: String,
    reward: i64,
    difficulty: String,
    progress: Percent,
    status: String,
    description: String,
}

pub struct S4MissionsDeriver;

impl SectionDeriver for S4MissionsDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::S4Missions
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<MissionInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let missions: Vec<Mission> = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| Mission {
                id,
                description: r
                    .description
                    .unwrap_or_else(|| format!("完成{}以获得奖励", r.mission_name)),
                mission_name: r.mission_name,
                reward: r.reward,
                difficulty: r.difficulty,
                progress: r.progress,
                status: r.status,
            })
            .collect();

        Derived::fresh(key, &missions)
    }
}
