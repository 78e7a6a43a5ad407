//! # weibullit-core
//!
//! **Crack activation thresholds for brittle SPH bodies.**
//!
//! `weibullit-core` gives every particle of a smoothed-particle-hydrodynamics
//! snapshot a set of micro-crack ("flaw") activation thresholds drawn from the
//! Weibull distribution, following Benz & Asphaug, *Simulations of brittle
//! solids using smooth particle hydrodynamics*, Comp. Phys. Comm. 87 (1995).
//!
//! ## Quick Start
//!
//! ```no_run
//! use weibullit_core::{
//!     OutputDialect, RecordLayout, WeibullConfig, WeibullParams, read_particles, weibullit,
//!     write_particles,
//! };
//!
//! let layout = RecordLayout::default();
//! let particles = read_particles(std::io::stdin(), layout, None)?;
//!
//! let config = WeibullConfig::new(WeibullParams::BASALT);
//! let run = weibullit(particles, &config)?;
//! println!("{} flaws on {} particles", run.report.total_flaws, run.report.eligible);
//!
//! write_particles(std::io::stdout(), &run.particles, layout, OutputDialect::Plain)?;
//! # Ok::<(), weibullit_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Codec (read) → ParticleStore → Volume → Planner → Random pass → Backfill → Codec (write)
//!
//! - The **volume** of the weibulled material is supplied or summed from
//!   `mass / density` of the eligible particles.
//! - The **planner** schedules `floor(N ln N)` thresholds for `N` eligible
//!   particles.
//! - The **random pass** hands them out to uniformly drawn particles,
//!   rejecting ineligible or capped ones.
//! - The **backfill** gives one more threshold to each eligible particle the
//!   random pass missed.

pub mod codec;
pub mod config;
pub mod distribute;
pub mod error;
pub mod particle;
pub mod summary;
pub mod volume;

pub use codec::{
    FLAW_SLOTS, OutputDialect, RecordLayout, format_exp, parse_particles, read_particles,
    write_particles,
};
pub use config::{DEFAULT_MAX_FLAWS, DEFAULT_SEED, WeibullConfig, WeibullParams};
pub use distribute::{DistributionReport, Plan, WeibullRun, plan, planned_flaw_count, weibullit};
pub use error::{Error, Result};
pub use particle::{DIM, MaterialFilter, Particle, ParticleStore};
pub use summary::{RunSummary, SUMMARY_VERSION};
pub use volume::{VolumeEstimate, VolumeSource, estimate_volume, material_volume};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
