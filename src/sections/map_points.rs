use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{RawContent, SectionKey};

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
struct Coordinates {
    x: i64,
    y: i64,
}

#[derive(Debug, Deserialize)]
struct MapInput {
    map_id: Option<u32>,
    map_name: String,
    #[serde(default)]
    points: Vec<PointInput>,
}

#[derive(Debug, Deserialize)]
struct PointInput {
    id: Option<u32>,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: String,
    coordinates: Coordinates,
    risk_level: String,
}

#[derive(Debug, Serialize)]
struct MapEntry {
    map_id: u32,
    map_name: String,
    points: Vec<Point>,
}

#[derive(Debug, Serialize)]
struct Point {
    id: u32,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    description: String,
    coordinates: Coordinates,
    risk_level: String,
}

pub struct MapPointsDeriver;

impl SectionDeriver for MapPointsDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::MapPoints
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(maps) = read_island::<Vec<MapInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let map_ids = assign_ids(key, maps.iter().map(|m| m.map_id))?;
        let mut out = Vec::with_capacity(maps.len());
        for (map, map_id) in maps.into_iter().zip(map_ids) {
            // point ids restart per map
            let point_ids = assign_ids(key, map.points.iter().map(|p| p.id))?;
            let points = map
                .points
                .into_iter()
                .zip(point_ids)
                .map(|(p, id)| Point {
                    id,
                    name: p.name,
                    kind: p.kind,
                    description: p.description,
                    coordinates: p.coordinates,
                    risk_level: p.risk_level,
                })
                .collect();
            out.push(MapEntry {
                map_id,
                map_name: map.map_name,
                points,
            });
        }

        Derived::fresh(key, &out)
    }
}
