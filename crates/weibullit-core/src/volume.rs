//! Target volume of the weibulled body.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::particle::{MaterialFilter, ParticleStore};

/// Where the target volume came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    /// Given on the command line.
    Supplied,
    /// Summed from particle masses and densities.
    Estimated,
}

impl std::fmt::Display for VolumeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supplied => write!(f, "supplied"),
            Self::Estimated => write!(f, "estimated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeEstimate {
    pub volume: f64,
    pub source: VolumeSource,
}

/// Sum `mass / density` (divided by `alpha` for porous material) over the
/// particles the filter lets through.
pub fn material_volume(store: &ParticleStore, filter: MaterialFilter, porous: bool) -> f64 {
    store
        .iter()
        .filter(|p| filter.matches(p))
        .map(|p| {
            let vol = p.mass / p.density;
            if porous { vol / p.alpha } else { vol }
        })
        .sum()
}

/// Resolve the target volume for a run.
///
/// A non-negative supplied volume is used as-is; a negative one falls back
/// to the estimate. Either way the result must be positive
/// and finite: a zero volume would turn every threshold into infinity.
pub fn estimate_volume(
    store: &ParticleStore,
    supplied: Option<f64>,
    filter: MaterialFilter,
    porous: bool,
) -> Result<VolumeEstimate> {
    let estimate = match supplied {
        Some(volume) if volume >= 0.0 => VolumeEstimate {
            volume,
            source: VolumeSource::Supplied,
        },
        _ => {
            let volume = material_volume(store, filter, porous);
            log::debug!(
                "Summed volume of {} eligible particles{}: {volume:e}",
                store.eligible_count(filter),
                if porous { " (porosity corrected)" } else { "" }
            );
            VolumeEstimate {
                volume,
                source: VolumeSource::Estimated,
            }
        }
    };

    if !(estimate.volume.is_finite() && estimate.volume > 0.0) {
        return Err(Error::InvalidVolume(estimate.volume));
    }
    Ok(estimate)
}
