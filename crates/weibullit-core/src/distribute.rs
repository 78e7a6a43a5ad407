//! Weibull flaw distribution.
//!
//! A run has two phases:
//!
//! 1. **Random pass**: `n_f = floor(N ln N)` activation thresholds are handed
//!    out one by one. For each, a particle index is drawn uniformly from the
//!    whole store and redrawn until the particle is eligible (material filter)
//!    and below the per-particle cap. The i-th threshold (1-based) is
//!    `(i / (k V))^(1/m)`.
//! 2. **Backfill**: eligible particles that are still without a flaw are
//!    collected in storage order and each receives exactly one threshold,
//!    continuing the draw index from `n_f`.
//!
//! Afterwards every eligible particle carries at least one flaw.
//!
//! The generator is seeded once per run, so the assignment is fully
//! determined by seed, particles and configuration.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};

use crate::codec::format_exp;
use crate::config::{WeibullConfig, WeibullParams};
use crate::error::{Error, Result};
use crate::particle::{MaterialFilter, Particle, ParticleStore};
use crate::volume::{VolumeEstimate, VolumeSource, estimate_volume};

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Number of thresholds handed out in the random pass: `floor(N ln N)`.
///
/// Zero for `N <= 1`, where the logarithm is not positive.
pub fn planned_flaw_count(eligible: usize) -> usize {
    if eligible <= 1 {
        return 0;
    }
    let n = eligible as f64;
    (n * n.ln()).floor() as usize
}

/// What a run would do, computed before touching any particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub particles: usize,
    pub eligible: usize,
    pub planned: usize,
    pub volume: VolumeEstimate,
}

impl Plan {
    /// Expected flaws per eligible particle from the random pass alone.
    pub fn mean_flaws(&self) -> f64 {
        if self.eligible == 0 {
            0.0
        } else {
            self.planned as f64 / self.eligible as f64
        }
    }
}

/// Validate the configuration against the particles and work out the
/// eligible population, the target volume and the flaw count.
///
/// Every configuration that would make the random pass spin forever (empty
/// eligible population, zero cap) or produce infinite thresholds (zero
/// volume) is rejected here.
pub fn plan(store: &ParticleStore, config: &WeibullConfig) -> Result<Plan> {
    config.validate()?;

    let eligible = store.eligible_count(config.material_filter);
    if eligible == 0 {
        return Err(Error::EmptyPopulation {
            material_type: config.material_filter.material_type(),
        });
    }

    let volume = estimate_volume(
        store,
        config.target_volume,
        config.material_filter,
        config.porous,
    )?;

    Ok(Plan {
        particles: store.len(),
        eligible,
        planned: planned_flaw_count(eligible),
        volume,
    })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub particles: usize,
    pub eligible: usize,
    /// Thresholds scheduled for the random pass.
    pub planned: usize,
    /// Thresholds actually placed by the random pass.
    pub placed: usize,
    /// The random pass ran out of capacity before placing all planned thresholds.
    pub saturated: bool,
    /// Particles that received their only flaw from the backfill pass.
    pub backfilled: usize,
    pub total_flaws: usize,
    pub target_volume: f64,
    pub volume_source: VolumeSource,
    pub seed: u64,
    pub mean_flaws_per_particle: f64,
    pub min_threshold: Option<f64>,
    pub max_threshold: Option<f64>,
}

/// Particles with their flaws assigned, plus what happened.
#[derive(Debug, Clone)]
pub struct WeibullRun {
    pub particles: ParticleStore,
    pub report: DistributionReport,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Distribute activation thresholds over `store`.
///
/// The store is consumed and handed back only on success, so a failed run
/// can never be mistaken for a finished one.
pub fn weibullit(store: ParticleStore, config: &WeibullConfig) -> Result<WeibullRun> {
    let plan = plan(&store, config)?;

    log::info!("Weibulling {} particles", plan.eligible);
    log::info!("{}", target_volume_line(&plan.volume));
    log::debug!(
        "Distributing {} crack activation threshold strains for {} particles",
        plan.planned,
        plan.eligible
    );

    let mut distributor = Distributor::new(store, config, plan.volume.volume);
    let placed = distributor.random_pass(plan.planned)?;

    log::debug!("Making sure each particle gets at least one flaw");
    let backfilled = distributor.backfill(plan.planned.max(1))?;

    let particles = distributor.into_store();
    let total_flaws = particles.total_flaws();
    let (min_threshold, max_threshold) = threshold_range(&particles);
    let mean = total_flaws as f64 / plan.eligible as f64;
    log::debug!("Mean number of flaws per particle: {}", format_exp(mean, 6));

    let report = DistributionReport {
        particles: plan.particles,
        eligible: plan.eligible,
        planned: plan.planned,
        placed,
        saturated: placed < plan.planned,
        backfilled,
        total_flaws,
        target_volume: plan.volume.volume,
        volume_source: plan.volume.source,
        seed: config.seed,
        mean_flaws_per_particle: mean,
        min_threshold,
        max_threshold,
    };

    Ok(WeibullRun { particles, report })
}

/// Operator line for the target volume, printed like C's `%e`.
fn target_volume_line(volume: &VolumeEstimate) -> String {
    format!(
        "Target volume: {} ({})",
        format_exp(volume.volume, 6),
        volume.source
    )
}

fn threshold_range(store: &ParticleStore) -> (Option<f64>, Option<f64>) {
    store
        .iter()
        .flat_map(|p| p.flaws().iter().copied())
        .fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), t| {
            (
                Some(lo.map_or(t, |lo| lo.min(t))),
                Some(hi.map_or(t, |hi| hi.max(t))),
            )
        })
}

// ---------------------------------------------------------------------------
// Distributor
// ---------------------------------------------------------------------------

/// Rejection predicate of the random pass: the particle is eligible and has
/// room for another flaw.
fn accepts(particle: &Particle, filter: MaterialFilter, cap: usize) -> bool {
    particle.flaw_count() < cap && filter.matches(particle)
}

struct Distributor {
    store: ParticleStore,
    params: WeibullParams,
    filter: MaterialFilter,
    cap: usize,
    volume: f64,
    rng: ChaChaRng,
}

impl Distributor {
    fn new(store: ParticleStore, config: &WeibullConfig, volume: f64) -> Self {
        Self {
            store,
            params: config.params,
            filter: config.material_filter,
            cap: config.max_flaws_per_particle,
            volume,
            rng: ChaChaRng::seed_from_u64(config.seed),
        }
    }

    /// Free flaw slots over all eligible particles.
    fn remaining_capacity(&self) -> usize {
        self.store
            .iter()
            .filter(|p| self.filter.matches(p))
            .map(|p| self.cap.saturating_sub(p.flaw_count()))
            .fold(0usize, usize::saturating_add)
    }

    /// Draw particle indices until one passes [`accepts`].
    ///
    /// Only called while at least one eligible particle has room, so every
    /// draw succeeds with probability at least `1 / len`.
    fn draw(&mut self) -> usize {
        let n = self.store.len();
        loop {
            let j = self.rng.random_range(0..n);
            if self
                .store
                .get(j)
                .is_some_and(|p| accepts(p, self.filter, self.cap))
            {
                return j;
            }
        }
    }

    /// Hand out up to `planned` thresholds with draw indices `1..=planned`.
    /// Returns how many were placed.
    fn random_pass(&mut self, planned: usize) -> Result<usize> {
        let mut capacity = self.remaining_capacity();
        for i in 0..planned {
            if capacity == 0 {
                log::warn!(
                    "Every eligible particle holds {} flaws; placed {i} of {planned} thresholds",
                    self.cap
                );
                return Ok(i);
            }
            let j = self.draw();
            let threshold = self.params.threshold(i + 1, self.volume);
            self.store.push_flaw(j, threshold)?;
            capacity -= 1;
        }
        Ok(planned)
    }

    /// Give one threshold to every eligible particle without flaws, in
    /// storage order, with draw indices starting at `first_draw_index`.
    /// Returns the number of particles served.
    fn backfill(&mut self, first_draw_index: usize) -> Result<usize> {
        let missing: Vec<usize> = self
            .store
            .iter()
            .enumerate()
            .filter(|(_, p)| self.filter.matches(p) && p.flaw_count() == 0)
            .map(|(i, _)| i)
            .collect();

        match missing.len() {
            0 => {}
            1 => log::debug!("There is only one particle left without any flaw"),
            n => log::debug!("There are still {n} particles without any flaw left"),
        }

        for (offset, &index) in missing.iter().enumerate() {
            let threshold = self.params.threshold(first_draw_index + offset, self.volume);
            self.store.push_flaw(index, threshold)?;
        }
        Ok(missing.len())
    }

    fn into_store(self) -> ParticleStore {
        self.store
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
