//! Shared fixture-building helpers for the integration test suite.

use std::io::Write;

use serde_json::json;
use statemap::{IngestConfig, Record, Statemap};
use tempfile::NamedTempFile;

/// One state-transition datum to feed the engine.
pub struct Datum {
    pub entity: &'static str,
    pub time: u64,
    pub state: u32,
    pub tag: Option<&'static str>,
}

pub fn datum(entity: &'static str, time: u64, state: u32) -> Datum {
    Datum {
        entity,
        time,
        state,
        tag: None,
    }
}

pub fn tagged(entity: &'static str, time: u64, state: u32, tag: &'static str) -> Datum {
    Datum {
        entity,
        time,
        state,
        tag: Some(tag),
    }
}

/// Writes a metadata blob (states named `s0`, `s1`, ... in `[0, nstates)`)
/// followed by one blob per datum, and returns the temp file it was
/// written to.
pub fn write_trace(nstates: u32, data: &[Datum]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp trace file");

    let mut states = serde_json::Map::new();
    for i in 0..nstates {
        states.insert(format!("s{i}"), json!({ "value": i }));
    }
    let metadata = json!({ "states": states });
    writeln!(file, "{metadata}").unwrap();

    for d in data {
        let mut obj = json!({
            "entity": d.entity,
            "time": d.time,
            "state": d.state,
        });
        if let Some(tag) = d.tag {
            obj["tag"] = json!(tag);
        }
        writeln!(file, "{obj}").unwrap();
    }

    file.flush().unwrap();
    file
}

/// Writes a raw trace body (already-formed metadata + datum blobs) to
/// a temp file, for scenarios that need hand-written JSON.
pub fn write_raw_trace(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp trace file");
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Runs ingest over `data` with `nstates` states and the given config,
/// returning every emitted record plus the coalesce count.
pub fn ingest(nstates: u32, data: &[Datum], config: IngestConfig) -> (Vec<Record>, u64) {
    let file = write_trace(nstates, data);
    let mut statemap = Statemap::create(config);
    let mut records = Vec::new();
    let ncoalesced = statemap
        .ingest(file.path(), |r| records.push(r))
        .expect("ingest should succeed");
    (records, ncoalesced)
}

pub fn rectangles(records: &[Record]) -> Vec<(&str, u64, u64, &[u64])> {
    records
        .iter()
        .filter_map(|r| match r {
            Record::Rectangle {
                entity,
                time,
                duration,
                states,
                ..
            } => Some((entity.as_str(), *time, *duration, states.as_slice())),
            _ => None,
        })
        .collect()
}
