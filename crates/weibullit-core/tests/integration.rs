//! Integration tests for weibullit-core.
//!
//! These tests run the whole pipeline:
//! text records → particle store → distribution → text records.

use weibullit_core::{
    Error, FLAW_SLOTS, MaterialFilter, OutputDialect, Particle, ParticleStore, RecordLayout,
    WeibullConfig, WeibullParams, format_exp, parse_particles, weibullit, write_particles,
};

fn body(n: usize, material_type: i32) -> Vec<Particle> {
    (0..n)
        .map(|i| {
            let mut p = Particle::default();
            p.position = [i as f64 * 0.1, 0.5, -0.25];
            p.velocity = [0.0, 0.0, 1.0e-2];
            p.mass = 2.5e-3;
            p.density = 2.7e3;
            p.energy = 1.0e3;
            p.material_type = material_type;
            p.alpha = 1.0;
            p.stress[0][1] = 1.25e4;
            p.stress[1][0] = 1.25e4;
            p
        })
        .collect()
}

fn render(store: &ParticleStore, layout: RecordLayout, dialect: OutputDialect) -> String {
    let mut out = Vec::new();
    write_particles(&mut out, store, layout, dialect).unwrap();
    String::from_utf8(out).unwrap()
}

fn run_text(input: &str, layout: RecordLayout, config: &WeibullConfig) -> String {
    let store = parse_particles(input, layout, None).unwrap();
    let run = weibullit(store, config).unwrap();
    render(&run.particles, layout, OutputDialect::Plain)
}

#[test]
fn small_uniform_population() {
    let input = render(&body(10, 0).into(), RecordLayout::default(), OutputDialect::Plain);
    let store = parse_particles(&input, RecordLayout::default(), None).unwrap();

    let mut config = WeibullConfig::new(WeibullParams::BASALT);
    config.target_volume = Some(1.0);
    let run = weibullit(store, &config).unwrap();

    assert_eq!(run.report.planned, 23);
    let zero_after_random = run.report.backfilled;
    assert_eq!(run.particles.total_flaws(), 23 + zero_after_random);
    assert!(run.particles.iter().all(|p| p.flaw_count() >= 1));
}

#[test]
fn filter_that_matches_nothing_is_a_configuration_error() {
    let store: ParticleStore = body(5, 2).into();
    let mut config = WeibullConfig::new(WeibullParams::BASALT);
    config.material_filter = MaterialFilter::Only(5);

    let err = weibullit(store, &config).unwrap_err();
    assert!(matches!(
        err,
        Error::EmptyPopulation {
            material_type: Some(5)
        }
    ));
}

#[test]
fn passthrough_fields_survive_byte_for_byte() {
    // One eligible particle: nothing to distribute randomly, one backfill.
    let mut particles = body(4, 7);
    particles[2].material_type = 1;
    let input = render(&particles.into(), RecordLayout::default(), OutputDialect::Plain);

    let mut config = WeibullConfig::new(WeibullParams::BASALT);
    config.material_filter = MaterialFilter::Only(1);
    config.target_volume = Some(1.0e-6);
    let output = run_text(&input, RecordLayout::default(), &config);

    let threshold = format_exp(WeibullParams::BASALT.threshold(1, 1.0e-6), 6);
    for (i, (before, after)) in input.lines().zip(output.lines()).enumerate() {
        if i == 2 {
            let expected = format!("{}{threshold}\t", before.replacen("\t1\t0\t", "\t1\t1\t", 1));
            assert_eq!(after, expected);
        } else {
            assert_eq!(after, before);
        }
    }
    assert_eq!(input.lines().count(), output.lines().count());
}

#[test]
fn porous_plastic_layout_round_trips() {
    let layout = RecordLayout {
        plasticity: true,
        porous: true,
        ..Default::default()
    };
    let mut particles = body(1, 0);
    particles[0].alpha = 1.8;
    particles[0].pressure = 2.0e5;
    particles[0].plastic_strain = 1.0e-3;
    particles[0].temperature = 293.0;
    let input = render(&particles.into(), layout, OutputDialect::Plain);

    let mut config = WeibullConfig::new(WeibullParams::BASALT);
    config.porous = true;
    let output = run_text(&input, layout, &config);

    let before: Vec<&str> = input.trim_end().split('\t').collect();
    let after: Vec<&str> = output.trim_end().split('\t').collect();
    assert_eq!(after.len(), before.len() + 1);
    for (i, (a, b)) in before.iter().zip(&after).enumerate() {
        if i == 10 {
            assert_eq!(*b, "1");
        } else {
            assert_eq!(a, b);
        }
    }
}

#[test]
fn same_seed_same_output() {
    let input = render(&body(200, 0).into(), RecordLayout::default(), OutputDialect::Plain);
    let config = WeibullConfig::new(WeibullParams::BASALT);
    let a = run_text(&input, RecordLayout::default(), &config);
    let b = run_text(&input, RecordLayout::default(), &config);
    assert_eq!(a, b);
}

#[test]
fn fixed_width_dialect_after_distribution() {
    let mut config = WeibullConfig::new(WeibullParams::BASALT);
    config.max_flaws_per_particle = 40;
    let run = weibullit(body(50, 0).into(), &config).unwrap();
    let out = render(&run.particles, RecordLayout::default(), OutputDialect::FixedWidth);
    for (i, line) in out.lines().enumerate() {
        let fields: Vec<&str> = line.split('\t').filter(|f| !f.is_empty()).collect();
        assert_eq!(fields[0], i.to_string());
        let nof: usize = fields[3].parse().unwrap();
        assert!((1..=FLAW_SLOTS).contains(&nof));
        assert_eq!(fields.len(), 4 + FLAW_SLOTS + 17);
        if nof < FLAW_SLOTS {
            assert_eq!(fields[4 + nof], "-1.000000e+00");
        }
    }
}
