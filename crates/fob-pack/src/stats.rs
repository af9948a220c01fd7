//! Build statistics for one executor run.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Totals of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    pub total_bytes: u64,
    pub unit_count: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Accumulates unit sizes from the start of a run until [`finish`].
///
/// [`finish`]: StatsReporter::finish
#[derive(Debug)]
pub struct StatsReporter {
    started: Instant,
    total_bytes: u64,
    unit_count: usize,
}

impl StatsReporter {
    /// Start a fresh accumulator; the clock starts now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            total_bytes: 0,
            unit_count: 0,
        }
    }

    /// Count one written unit of `bytes` bytes.
    pub fn record(&mut self, bytes: u64) {
        self.unit_count += 1;
        self.total_bytes += bytes;
    }

    pub fn unit_count(&self) -> usize {
        self.unit_count
    }

    pub fn finish(self) -> BundleStats {
        BundleStats {
            total_bytes: self.total_bytes,
            unit_count: self.unit_count,
            elapsed: self.started.elapsed(),
        }
    }
}
