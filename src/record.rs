//! Records delivered to the ingest caller's callback, in emission
//! order (§4.8): tag definitions, then per-entity descriptions and
//! rectangles.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    TagDef {
        name: String,
        state: u32,
        index: u32,
        json: String,
    },
    Description {
        entity: String,
        description: String,
    },
    Rectangle {
        entity: String,
        time: u64,
        duration: u64,
        states: Vec<u64>,
        tags: Vec<TagRecord>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TagRecord {
    pub tag: u32,
    pub duration: u64,
}
