//! Configuration surface for a single ingest, matching the engine's
//! external `config` object one-for-one.

use clap::Args;

/// Default rectangle budget when the caller does not supply one.
pub const DEFAULT_MAXRECT: u32 = 25_000;

/// Metadata blobs larger than this are rejected outright.
pub const METADATA_MAX: usize = 16 * 1024;

/// Configuration for one [`crate::Statemap::ingest`] call.
///
/// `begin`/`end` clip the ingested window; `notags` disables tag
/// accounting entirely; `dryrun` is accepted for parity with the later
/// schema but does not change ingest behavior (see DESIGN.md).
#[derive(Debug, Clone, Args)]
pub struct IngestConfig {
    /// Maximum number of rectangles to retain before coalescing.
    #[arg(long, default_value_t = DEFAULT_MAXRECT)]
    pub maxrect: u32,

    /// Nanosecond offset at which to begin the window; data before this
    /// is clipped into the first retained rectangle.
    #[arg(long, default_value_t = 0)]
    pub begin: u64,

    /// Nanosecond offset at which to end the window; data after this is
    /// dropped. Unset, or `0`, means "run to the last observed time".
    #[arg(long)]
    pub end: Option<u64>,

    /// Disable tag accounting: no tag definitions are recorded and no
    /// rectangle carries a tag list.
    #[arg(long)]
    pub notags: bool,

    /// Accepted for parity with the later schema; currently unwired.
    #[arg(long)]
    pub dryrun: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            maxrect: DEFAULT_MAXRECT,
            begin: 0,
            end: None,
            notags: false,
            dryrun: false,
        }
    }
}

impl IngestConfig {
    pub(crate) fn maxrect(&self) -> u32 {
        if self.maxrect == 0 {
            DEFAULT_MAXRECT
        } else {
            self.maxrect
        }
    }

    /// `end`, with the `0` sentinel (reachable via `--end 0` or a host
    /// passing `end: Some(0)`) folded into "unset", matching the
    /// original's `smc_end == 0` convention.
    pub(crate) fn end(&self) -> Option<u64> {
        self.end.filter(|&end| end != 0)
    }
}
