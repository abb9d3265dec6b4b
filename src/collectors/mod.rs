//! Metric samplers over the host introspection layer.

pub mod cpu;
pub mod mem;
pub mod os;
pub mod proc;

use thiserror::Error;

/// Failure of a single sample. Logged and skipped; never aborts the tick.
/// The cadence slot is already consumed by the scheduler at that point.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("reading {path}: {source}")]
    Read {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

/// One decimal place, the precision used for outbound percentages.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
