use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{Percent, RawContent, SectionKey};

#[derive(Debug, Clone, Deserialize, Serialize)]
struct Component {
    name: String,
    item: String,
}

#[derive(Debug, Deserialize)]
struct WeaponInput {
    id: Option<u32>,
    weapon_name: String,
    weapon_type: String,
    code: String,
    description: Option<String>,
    #[serde(default)]
    components: Vec<Component>,
    effectiveness: Percent,
}

#[derive(Debug, Serialize)]
struct WeaponCode {
    id: u32,
    weapon_name: String,
    weapon_type: String,
    code: String,
    description: String,
    components: Vec<Component>,
    effectiveness: Percent,
}

pub struct WeaponCodesDeriver;

impl SectionDeriver for WeaponCodesDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::WeaponCodes
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<WeaponInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let codes: Vec<WeaponCode> = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| WeaponCode {
                id,
                description: r
                    .description
                    .unwrap_or_else(|| format!("{}最佳改装方案", r.weapon_name)),
                weapon_name: r.weapon_name,
                weapon_type: r.weapon_type,
                code: r.code.trim().to_string(),
                components: r.components,
                effectiveness: r.effectiveness,
            })
            .collect();

        Derived::fresh(key, &codes)
    }
}
