//! Error type shared by every stage of a weibulling run.
//!
//! There is no transient failure model: an error is either a misconfigured
//! run or an unrecoverable resource problem, and the run is abandoned.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a weibulling run.
#[derive(Debug, Error)]
pub enum Error {
    /// A Weibull constant is zero, negative or not finite.
    #[error("Weibull constant {name} must be positive and finite (got {value:e})")]
    InvalidParameter { name: &'static str, value: f64 },
    /// Maximum flaws per particle is zero, so no flaw can ever be placed.
    #[error("maximum flaws per particle must be at least 1")]
    ZeroFlawCap,
    #[error("seed must be at least 1")]
    InvalidSeed,
    /// No particle matches the material filter.
    #[error("{}", empty_population(*material_type))]
    EmptyPopulation { material_type: Option<i32> },
    /// Target volume is zero, negative or not finite.
    #[error("target volume must be positive and finite (got {0:e})")]
    InvalidVolume(f64),
    /// Growing a flaw list failed.
    #[error("cannot allocate memory for flaws of particle {particle}")]
    OutOfMemory { particle: usize },
    /// A token in the input could not be parsed.
    #[error("record {record}: cannot parse {field} from '{token}'")]
    Parse {
        record: usize,
        field: &'static str,
        token: String,
    },
    /// Input ended in the middle of a record, or before the requested count.
    #[error("record {record}: input ended before {field}")]
    Truncated {
        record: usize,
        field: &'static str,
    },
    #[error("reading flaws from a restarted run is not supported; start from a fresh input")]
    RestartUnsupported,
    /// Fixed-width dialect carries at most 40 threshold slots.
    #[error(
        "particle {particle} has {count} flaws but the fixed-width dialect holds at most {}",
        crate::codec::FLAW_SLOTS
    )]
    FlawSlotsExceeded { particle: usize, count: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn empty_population(material_type: Option<i32>) -> String {
    match material_type {
        Some(t) => format!("no particle has material type {t}, nothing to weibull"),
        None => "particle set is empty, nothing to weibull".to_string(),
    }
}
