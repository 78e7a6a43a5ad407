//! `weibullit plan`: show what a distribution would do.

use weibullit_core::{Plan, WeibullConfig, plan};

use super::{InputArgs, WeibullArgs, fail, load_particles};

pub fn run(input: &InputArgs, weibull: &WeibullArgs) {
    let config = weibull.config(input.porous);
    let particles = load_particles(input);
    match plan(&particles, &config) {
        Ok(p) => print_plan(&p, &config),
        Err(e) => fail(e),
    }
}

fn print_plan(p: &Plan, config: &WeibullConfig) {
    println!("Particles:          {}", p.particles);
    println!(
        "Eligible:           {} (material type {})",
        p.eligible, config.material_filter
    );
    println!(
        "Target volume:      {:e} ({})",
        p.volume.volume, p.volume.source
    );
    println!(
        "Weibull constants:  k = {:e}, m = {}",
        config.params.k, config.params.m
    );
    println!("Planned flaws:      {}", p.planned);
    println!("Mean per particle:  {:.3}", p.mean_flaws());
    println!("Max per particle:   {}", config.max_flaws_per_particle);
    println!("Seed:               {}", config.seed);

    if p.eligible > 1 && p.planned > p.eligible.saturating_mul(config.max_flaws_per_particle) {
        println!();
        println!("Warning: the per-particle cap leaves room for fewer flaws than planned;");
        println!("the random pass will stop early.");
    }
}
