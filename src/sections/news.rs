use serde::{Deserialize, Serialize};

use super::{assign_ids, read_island, Derived, SectionDeriver};
use crate::error::DeriveError;
use crate::types::{RawContent, SectionKey};

#[derive(Debug, Deserialize)]
struct NewsInput {
    id: Option<u32>,
    title: String,
    #[serde(default)]
    content: String,
    publish_time: String,
    category: String,
}

#[derive(Debug, Serialize)]
struct NewsItem {
    id: u32,
    title: String,
    content: String,
    publish_time: String,
    category: String,
}

pub struct NewsDeriver;

impl SectionDeriver for NewsDeriver {
    fn key(&self) -> SectionKey {
        SectionKey::News
    }

    fn derive(&self, raw: &RawContent) -> Result<Derived, DeriveError> {
        let key = self.key();
        let Some(rows) = read_island::<Vec<NewsInput>>(raw, key)? else {
            return Ok(Derived::degraded(key));
        };

        let ids = assign_ids(key, rows.iter().map(|r| r.id))?;
        let items: Vec<NewsItem> = rows
            .into_iter()
            .zip(ids)
            .map(|(r, id)| NewsItem {
                id,
                title: r.title.trim().to_string(),
                content: r.content.trim().to_string(),
                publish_time: r.publish_time,
                category: r.category,
            })
            .collect();

        Derived::fresh(key, &items)
    }
}
