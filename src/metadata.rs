//! Parses the leading metadata blob and establishes state cardinality.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::METADATA_MAX;
use crate::error::{
    DuplicateValueSnafu, MalformedMetadataSnafu, MetadataTooLargeSnafu, MissingStatesSnafu,
    MissingValueSnafu, Result, StatesNotObjectSnafu, ValueNotIntegerSnafu, ValueOutOfRangeSnafu,
};

/// The result of parsing the metadata blob: just the state cardinality.
/// State *names* are not retained -- only their ordinal `value` matters
/// to the engine, which addresses states by index everywhere.
pub struct Metadata {
    pub nstates: u32,
}

pub fn parse(bytes: &[u8]) -> Result<Metadata> {
    if bytes.len() > METADATA_MAX {
        return MetadataTooLargeSnafu {
            size: bytes.len(),
            max: METADATA_MAX,
        }
        .fail();
    }

    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        MalformedMetadataSnafu {
            reason: e.to_string(),
        }
        .build()
    })?;

    let states = value
        .get("states")
        .ok_or_else(|| MissingStatesSnafu.build())?;

    let states = states.as_object().ok_or_else(|| StatesNotObjectSnafu.build())?;

    let nstates = states.len() as u32;
    let mut assigned: HashMap<u32, &str> = HashMap::new();

    for (name, def) in states {
        let value = def
            .get("value")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                MissingValueSnafu {
                    state: name.clone(),
                }
                .build()
            })?;

        if value < 0 {
            return ValueNotIntegerSnafu {
                state: name.clone(),
            }
            .fail();
        }

        if value as u32 >= nstates {
            return ValueOutOfRangeSnafu {
                state: name.clone(),
                value,
                max: nstates.saturating_sub(1),
            }
            .fail();
        }

        let value = value as u32;

        if let Some(other) = assigned.insert(value, name.as_str()) {
            return DuplicateValueSnafu {
                state: name.clone(),
                other: other.to_string(),
                value,
            }
            .fail();
        }
    }

    Ok(Metadata { nstates })
}
