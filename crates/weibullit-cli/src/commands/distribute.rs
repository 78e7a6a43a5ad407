//! `weibullit distribute`: assign flaws and write the weibulled particles.

use std::fs;
use std::io::Write;
use std::path::Path;

use weibullit_core::{
    OutputDialect, ParticleStore, RecordLayout, RunSummary, WeibullConfig, WeibullRun, weibullit,
    write_particles,
};

use super::{InputArgs, WeibullArgs, fail, load_particles};

pub struct DistributeCommandConfig<'a> {
    pub input: &'a InputArgs,
    pub weibull: &'a WeibullArgs,
    pub output_path: Option<&'a str>,
    pub dialect: OutputDialect,
    pub summary_path: Option<&'a str>,
    pub check: bool,
}

/// Run the distribute command.
pub fn run(cfg: DistributeCommandConfig) {
    let layout = cfg.input.layout();
    let config = cfg.weibull.config(cfg.input.porous);
    let particles = load_particles(cfg.input);

    // Nothing is written unless the whole run succeeds.
    let (run, rendered) = match execute(particles, &config, layout, cfg.dialect) {
        Ok(done) => done,
        Err(e) => fail(e),
    };

    let summary = cfg.summary_path.map(|path| {
        let json = RunSummary::new(&config, layout, cfg.dialect, run.report.clone())
            .with_paths(cfg.input.filename.as_deref(), cfg.output_path)
            .to_json()
            .unwrap_or_else(|e| fail(e));
        (Path::new(path), json)
    });

    let summary_ref = summary.as_ref().map(|(path, json)| (*path, json.as_str()));
    if let Err(e) = emit(&rendered, cfg.output_path.map(Path::new), summary_ref) {
        fail(e);
    }
    if let Some((path, _)) = &summary {
        log::info!("Run summary written to {}", path.display());
    }

    if cfg.check {
        print_checks(&run, &config);
    }
}

/// Distribute and render into memory.
fn execute(
    particles: ParticleStore,
    config: &WeibullConfig,
    layout: RecordLayout,
    dialect: OutputDialect,
) -> weibullit_core::Result<(WeibullRun, Vec<u8>)> {
    let run = weibullit(particles, config)?;
    let mut rendered = Vec::new();
    write_particles(&mut rendered, &run.particles, layout, dialect)?;
    Ok((run, rendered))
}

/// Write the summary, then the particles. When either write fails, neither
/// file is left behind.
fn emit(
    rendered: &[u8],
    output: Option<&Path>,
    summary: Option<(&Path, &str)>,
) -> Result<(), String> {
    if let Some((path, json)) = summary {
        fs::write(path, json)
            .map_err(|e| format!("cannot write summary {}: {e}", path.display()))?;
    }

    let written = match output {
        Some(path) => fs::write(path, rendered),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered).and_then(|()| stdout.flush())
        }
    };
    if let Err(e) = written {
        if let Some(path) = output {
            let _ = fs::remove_file(path);
        }
        if let Some((path, _)) = summary {
            let _ = fs::remove_file(path);
        }
        let target = output.map_or_else(|| "stdout".to_string(), |p| p.display().to_string());
        return Err(format!("cannot write {target}: {e}"));
    }
    Ok(())
}

/// Print the statistical battery to stderr, keeping stdout for particles.
fn print_checks(run: &WeibullRun, config: &WeibullConfig) {
    let flaws: Vec<&[f64]> = run
        .particles
        .iter()
        .filter(|p| config.material_filter.matches(p))
        .map(|p| p.flaws())
        .collect();
    let results = weibullit_tests::run_all_tests(&flaws, config.params.m);

    eprintln!();
    eprintln!("  {:<22} {:>5} {:>10} {:>12}  Details", "Check", "Grade", "p-value", "Statistic");
    eprintln!("  {}", "-".repeat(72));
    for r in &results {
        let p = r
            .p_value
            .map(|p| format!("{p:.4}"))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "  {:<22} {:>5} {:>10} {:>12.4}  {}",
            r.name, r.grade, p, r.statistic, r.details
        );
    }
    let passed = results.iter().filter(|r| r.passed).count();
    eprintln!();
    eprintln!(
        "  Passed {passed}/{}  Quality score: {:.0}/100",
        results.len(),
        weibullit_tests::calculate_quality_score(&results)
    );
    if run.report.saturated {
        eprintln!(
            "  Note: random pass saturated at {} of {} thresholds",
            run.report.placed, run.report.planned
        );
    }
}
