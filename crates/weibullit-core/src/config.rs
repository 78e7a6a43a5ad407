//! Run configuration: Weibull constants, per-particle cap, volume override,
//! material filter and seed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::particle::MaterialFilter;

/// Default cap on flaws per particle (effectively unlimited).
pub const DEFAULT_MAX_FLAWS: usize = 1_000_000;

/// Default seed of the particle-picking generator.
pub const DEFAULT_SEED: u64 = 1;

/// The two Weibull constants of the flaw distribution.
///
/// The number of flaws per unit volume with activation threshold below a
/// strain `eps` is `k * eps^m`. Inverting for the i-th flaw of a body of
/// volume `V` gives `eps_i = (i / (k V))^(1/m)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    /// Number density constant, in 1/m^3.
    pub k: f64,
    /// Weibull modulus (shape).
    pub m: f64,
}

impl WeibullParams {
    /// Basalt, after Benz & Asphaug (1995).
    pub const BASALT: Self = Self { k: 5.0e34, m: 8.5 };

    pub fn new(k: f64, m: f64) -> Self {
        Self { k, m }
    }

    /// Activation threshold of the flaw with the given draw index.
    pub fn threshold(&self, draw_index: usize, volume: f64) -> f64 {
        (draw_index as f64 / (self.k * volume)).powf(1.0 / self.m)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.k.is_finite() && self.k > 0.0) {
            return Err(Error::InvalidParameter {
                name: "k",
                value: self.k,
            });
        }
        if !(self.m.is_finite() && self.m > 0.0) {
            return Err(Error::InvalidParameter {
                name: "m",
                value: self.m,
            });
        }
        Ok(())
    }
}

/// Everything the distributor needs to know about a run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeibullConfig {
    pub params: WeibullParams,
    pub max_flaws_per_particle: usize,
    /// Externally supplied target volume; estimated from the particles when `None`.
    pub target_volume: Option<f64>,
    pub material_filter: MaterialFilter,
    pub seed: u64,
    /// Particles carry a porosity distension that corrects their volume.
    pub porous: bool,
}

impl WeibullConfig {
    pub fn new(params: WeibullParams) -> Self {
        Self {
            params,
            max_flaws_per_particle: DEFAULT_MAX_FLAWS,
            target_volume: None,
            material_filter: MaterialFilter::All,
            seed: DEFAULT_SEED,
            porous: false,
        }
    }

    /// Reject configurations that cannot produce a valid distribution.
    ///
    /// Population-dependent checks (empty eligible set, zero estimated
    /// volume) happen once the particles are known.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if self.max_flaws_per_particle == 0 {
            return Err(Error::ZeroFlawCap);
        }
        if self.seed == 0 {
            return Err(Error::InvalidSeed);
        }
        if let Some(v) = self.target_volume {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidVolume(v));
            }
        }
        Ok(())
    }
}
