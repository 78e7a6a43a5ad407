//! Text record codec for particle snapshots.
//!
//! # Input
//!
//! Whitespace separated fields, one particle after the other:
//!
//! ```text
//! x y z  vx vy vz  mass density energy  [hsml noi]  material nof damage
//! [plastic_strain temperature]  S00 S01 S02 S10 .. S22  [alpha pressure]
//! ```
//!
//! Bracketed groups are present when the matching [`RecordLayout`] flag is
//! set. Input flaw counts are discarded: every particle starts unflawed.
//!
//! # Output
//!
//! Three dialects, see [`OutputDialect`]. Every field is followed by a tab
//! and every record ends with a newline. Floating point fields are printed
//! like C's `%e`.

use std::io::{Read, Write};
use std::iter::Peekable;
use std::str::SplitWhitespace;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::particle::{DIM, Particle, ParticleStore};

/// Threshold slots in the fixed-width and alternate dialects.
pub const FLAW_SLOTS: usize = 40;

/// Which optional field groups a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordLayout {
    /// Smoothing length and neighbour count follow the energy.
    pub restarted: bool,
    /// Plastic strain and temperature follow the damage.
    pub plasticity: bool,
    /// Porosity distension and pressure follow the stress tensor.
    pub porous: bool,
}

/// Output record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDialect {
    /// Input field order, then `nof` thresholds.
    #[default]
    Plain,
    /// Index, mass, material, nof, 40 threshold slots, then position,
    /// velocity, density, stress and damage.
    FixedWidth,
    /// Position, velocity, mass, density, energy, material and damage,
    /// stress, nof, then thresholds padded to 40 slots. Integers are
    /// printed as floats.
    Alternate,
}

impl std::fmt::Display for OutputDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::FixedWidth => write!(f, "fixed"),
            Self::Alternate => write!(f, "alternate"),
        }
    }
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// Format like C's `%.<precision>e`: signed exponent with at least two digits.
pub fn format_exp(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        let word = if value.is_nan() { "nan" } else { "inf" };
        return if value.is_sign_negative() {
            format!("-{word}")
        } else {
            word.to_string()
        };
    }
    let s = format!("{value:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

struct Tokens<'a> {
    inner: Peekable<SplitWhitespace<'a>>,
    record: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace().peekable(),
            record: 0,
        }
    }

    fn is_exhausted(&mut self) -> bool {
        self.inner.peek().is_none()
    }

    fn token(&mut self, field: &'static str) -> Result<&'a str> {
        self.inner.next().ok_or(Error::Truncated {
            record: self.record,
            field,
        })
    }

    fn float(&mut self, field: &'static str) -> Result<f64> {
        let token = self.token(field)?;
        token.parse().map_err(|_| Error::Parse {
            record: self.record,
            field,
            token: token.to_string(),
        })
    }

    fn int(&mut self, field: &'static str) -> Result<i32> {
        let token = self.token(field)?;
        token.parse().map_err(|_| Error::Parse {
            record: self.record,
            field,
            token: token.to_string(),
        })
    }

    fn vector(&mut self, field: &'static str) -> Result<[f64; DIM]> {
        let mut v = [0.0; DIM];
        for x in &mut v {
            *x = self.float(field)?;
        }
        Ok(v)
    }
}

/// Read a snapshot. With `count`, exactly that many records are read and any
/// trailing input is ignored; without it, records are read until the input
/// runs out.
pub fn read_particles<R: Read>(
    mut reader: R,
    layout: RecordLayout,
    count: Option<usize>,
) -> Result<ParticleStore> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_particles(&text, layout, count)
}

/// [`read_particles`] on text already in memory.
pub fn parse_particles(
    text: &str,
    layout: RecordLayout,
    count: Option<usize>,
) -> Result<ParticleStore> {
    if layout.restarted {
        return Err(Error::RestartUnsupported);
    }

    let mut tokens = Tokens::new(text);
    let mut store = ParticleStore::with_capacity(count.unwrap_or(0));
    let mut discarded = 0usize;

    loop {
        match count {
            Some(n) if store.len() == n => break,
            None if tokens.is_exhausted() => break,
            _ => {}
        }
        tokens.record = store.len();
        let (particle, input_flaws) = parse_record(&mut tokens, layout)?;
        if input_flaws != 0 {
            discarded += 1;
        }
        store.push(particle);
    }

    if discarded > 0 {
        log::warn!("Ignoring flaw counts of {discarded} particles; every particle starts unflawed");
    }
    log::debug!("Read {} particles", store.len());
    Ok(store)
}

fn parse_record(tokens: &mut Tokens<'_>, layout: RecordLayout) -> Result<(Particle, i32)> {
    let mut p = Particle {
        position: tokens.vector("position")?,
        velocity: tokens.vector("velocity")?,
        mass: tokens.float("mass")?,
        density: tokens.float("density")?,
        energy: tokens.float("energy")?,
        ..Default::default()
    };
    p.material_type = tokens.int("material type")?;
    let input_flaws = tokens.int("flaw count")?;
    p.damage = tokens.float("damage")?;
    if layout.plasticity {
        p.plastic_strain = tokens.float("plastic strain")?;
        p.temperature = tokens.float("temperature")?;
    }
    for row in &mut p.stress {
        *row = tokens.vector("stress")?;
    }
    if layout.porous {
        p.alpha = tokens.float("alpha")?;
        p.pressure = tokens.float("pressure")?;
    }
    Ok((p, input_flaws))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// One output record under construction.
#[derive(Default)]
struct Line(String);

impl Line {
    fn raw(&mut self, s: &str) {
        self.0.push_str(s);
        self.0.push('\t');
    }

    fn exp(&mut self, v: f64) {
        self.raw(&format_exp(v, 6));
    }

    fn exp_with(&mut self, v: f64, precision: usize) {
        self.raw(&format_exp(v, precision));
    }

    fn int(&mut self, v: impl std::fmt::Display) {
        self.raw(&v.to_string());
    }

    fn vector(&mut self, v: &[f64; DIM]) {
        for &x in v {
            self.exp(x);
        }
    }

    fn tensor(&mut self, t: &[[f64; DIM]; DIM]) {
        for row in t {
            self.vector(row);
        }
    }

    fn finish(mut self) -> String {
        self.0.push('\n');
        self.0
    }
}

/// Write every particle in the chosen dialect.
pub fn write_particles<W: Write>(
    mut writer: W,
    store: &ParticleStore,
    layout: RecordLayout,
    dialect: OutputDialect,
) -> Result<()> {
    for (index, p) in store.iter().enumerate() {
        let line = match dialect {
            OutputDialect::Plain => plain_record(p, layout),
            OutputDialect::FixedWidth => fixed_width_record(index, p)?,
            OutputDialect::Alternate => alternate_record(p),
        };
        writer.write_all(line.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn plain_record(p: &Particle, layout: RecordLayout) -> String {
    let mut line = Line::default();
    line.vector(&p.position);
    line.vector(&p.velocity);
    line.exp(p.mass);
    line.exp_with(p.density, 10);
    line.exp(p.energy);
    if layout.restarted {
        line.exp(p.smoothing_length);
        line.int(p.neighbor_count);
    }
    line.int(p.material_type);
    line.int(p.flaw_count());
    line.exp(p.damage);
    if layout.plasticity {
        line.exp(p.plastic_strain);
        line.exp(p.temperature);
    }
    line.tensor(&p.stress);
    if layout.porous {
        line.exp(p.alpha);
        line.exp(p.pressure);
    }
    for &t in p.flaws() {
        line.exp(t);
    }
    line.finish()
}

fn fixed_width_record(index: usize, p: &Particle) -> Result<String> {
    let count = p.flaw_count();
    if count > FLAW_SLOTS {
        return Err(Error::FlawSlotsExceeded {
            particle: index,
            count,
        });
    }
    let mut line = Line::default();
    line.int(index);
    line.exp(p.mass);
    line.int(p.material_type);
    line.int(count);
    for &t in p.flaws() {
        line.exp(t);
    }
    for _ in count..FLAW_SLOTS {
        line.exp(-1.0);
    }
    line.vector(&p.position);
    line.vector(&p.velocity);
    line.exp(p.density);
    line.tensor(&p.stress);
    line.exp(p.damage);
    Ok(line.finish())
}

fn alternate_record(p: &Particle) -> String {
    let mut line = Line::default();
    line.vector(&p.position);
    line.vector(&p.velocity);
    line.exp(p.mass);
    line.exp(p.density);
    line.exp(p.energy);
    line.exp(f64::from(p.material_type));
    line.exp(p.damage);
    line.tensor(&p.stress);
    line.exp(p.flaw_count() as f64);
    for &t in p.flaws() {
        line.exp(t);
    }
    for _ in p.flaw_count()..FLAW_SLOTS {
        line.raw("-1.0");
    }
    line.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "1.000000e+00\t2.000000e+00\t3.000000e+00\t\
        0.000000e+00\t-1.000000e-03\t0.000000e+00\t\
        5.000000e-01\t2.7000000000e+03\t1.000000e+01\t\
        2\t0\t0.000000e+00\t\
        1.000000e+05\t0.000000e+00\t0.000000e+00\t\
        0.000000e+00\t-5.000000e+04\t0.000000e+00\t\
        0.000000e+00\t0.000000e+00\t-5.000000e+04\t\n";

    fn sample() -> Particle {
        let mut p = Particle {
            position: [1.0, 2.0, 3.0],
            velocity: [0.0, -1e-3, 0.0],
            mass: 0.5,
            density: 2700.0,
            energy: 10.0,
            material_type: 2,
            ..Default::default()
        };
        p.stress[0][0] = 1e5;
        p.stress[1][1] = -5e4;
        p.stress[2][2] = -5e4;
        p
    }

    fn fields(line: &str) -> Vec<&str> {
        line.trim_end_matches('\n')
            .split('\t')
            .filter(|s| !s.is_empty())
            .collect()
    }

    // -----------------------------------------------------------------------
    // format_exp
    // -----------------------------------------------------------------------

    #[test]
    fn test_format_exp_matches_c() {
        assert_eq!(format_exp(1.0, 6), "1.000000e+00");
        assert_eq!(format_exp(0.0, 6), "0.000000e+00");
        assert_eq!(format_exp(-1.0, 6), "-1.000000e+00");
        assert_eq!(format_exp(1.5e-7, 6), "1.500000e-07");
        assert_eq!(format_exp(5.0e34, 6), "5.000000e+34");
        assert_eq!(format_exp(1.0e100, 6), "1.000000e+100");
        assert_eq!(format_exp(2700.0, 10), "2.7000000000e+03");
    }

    #[test]
    fn test_format_exp_non_finite() {
        assert_eq!(format_exp(f64::INFINITY, 6), "inf");
        assert_eq!(format_exp(f64::NEG_INFINITY, 6), "-inf");
        assert_eq!(format_exp(f64::NAN, 6), "nan");
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_single_record() {
        let store = parse_particles(RECORD, RecordLayout::default(), None).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap(), &sample());
    }

    #[test]
    fn test_parse_is_whitespace_agnostic() {
        let text = RECORD.replace('\t', "  \n ");
        let store = parse_particles(&text, RecordLayout::default(), None).unwrap();
        assert_eq!(store.get(0).unwrap(), &sample());
    }

    #[test]
    fn test_parse_count_limits_records() {
        let text = RECORD.repeat(3);
        let store = parse_particles(&text, RecordLayout::default(), Some(2)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_parse_count_beyond_input_is_truncated() {
        let err = parse_particles(RECORD, RecordLayout::default(), Some(2)).unwrap_err();
        assert!(matches!(err, Error::Truncated { record: 1, .. }));
    }

    #[test]
    fn test_parse_partial_record_is_truncated() {
        let err = parse_particles("1 2 3 4 5", RecordLayout::default(), None).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                record: 0,
                field: "velocity"
            }
        ));
    }

    #[test]
    fn test_parse_bad_token() {
        let text = RECORD.replacen("5.000000e-01", "heavy", 1);
        let err = parse_particles(&text, RecordLayout::default(), None).unwrap_err();
        assert!(matches!(err, Error::Parse { field: "mass", .. }));
    }

    #[test]
    fn test_parse_material_type_must_be_integer() {
        let text = RECORD.replacen("\t2\t", "\t2.5\t", 1);
        let err = parse_particles(&text, RecordLayout::default(), None).unwrap_err();
        assert!(matches!(err, Error::Parse { field: "material type", .. }));
    }

    #[test]
    fn test_parse_optional_groups() {
        let layout = RecordLayout {
            plasticity: true,
            porous: true,
            ..Default::default()
        };
        let text = "0 0 0  0 0 0  1 2 3  4 0 0.5  0.1 300  1 2 3 4 5 6 7 8 9  1.25 1e5";
        let store = parse_particles(text, layout, None).unwrap();
        let p = store.get(0).unwrap();
        assert_eq!(p.material_type, 4);
        assert_eq!(p.damage, 0.5);
        assert_eq!(p.plastic_strain, 0.1);
        assert_eq!(p.temperature, 300.0);
        assert_eq!(p.stress[2], [7.0, 8.0, 9.0]);
        assert_eq!(p.alpha, 1.25);
        assert_eq!(p.pressure, 1e5);
    }

    #[test]
    fn test_input_flaw_count_is_discarded() {
        let text = RECORD.replacen("\t2\t0\t", "\t2\t3\t", 1);
        let store = parse_particles(&text, RecordLayout::default(), None).unwrap();
        assert_eq!(store.get(0).unwrap().flaw_count(), 0);
    }

    #[test]
    fn test_restarted_layout_unsupported() {
        let layout = RecordLayout {
            restarted: true,
            ..Default::default()
        };
        let err = read_particles(RECORD.as_bytes(), layout, None).unwrap_err();
        assert!(matches!(err, Error::RestartUnsupported));
    }

    #[test]
    fn test_empty_input_is_empty_store() {
        let store = parse_particles("  \n", RecordLayout::default(), None).unwrap();
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    fn render(store: &ParticleStore, layout: RecordLayout, dialect: OutputDialect) -> String {
        let mut out = Vec::new();
        write_particles(&mut out, store, layout, dialect).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_record_matches_input_layout() {
        let store: ParticleStore = vec![sample()].into();
        assert_eq!(render(&store, RecordLayout::default(), OutputDialect::Plain), RECORD);
    }

    #[test]
    fn test_plain_record_appends_flaws() {
        let mut p = sample();
        p.push_flaw(0, 1.0e-4).unwrap();
        p.push_flaw(0, 2.5e-4).unwrap();
        let out = render(&vec![p].into(), RecordLayout::default(), OutputDialect::Plain);
        let f = fields(&out);
        assert_eq!(f.len(), 21 + 2);
        assert_eq!(f[10], "2");
        assert_eq!(f[21], "1.000000e-04");
        assert_eq!(f[22], "2.500000e-04");
    }

    #[test]
    fn test_plain_record_optional_groups() {
        let layout = RecordLayout {
            restarted: true,
            plasticity: true,
            porous: true,
        };
        let mut p = sample();
        p.neighbor_count = 42;
        p.alpha = 1.5;
        let out = render(&vec![p].into(), layout, OutputDialect::Plain);
        let f = fields(&out);
        assert_eq!(f.len(), 21 + 2 + 2 + 2);
        assert_eq!(f[10], "42");
        assert_eq!(f[25], "1.500000e+00");
    }

    #[test]
    fn test_fixed_width_record() {
        let mut p = sample();
        p.push_flaw(0, 3.0e-4).unwrap();
        let out = render(&vec![p].into(), RecordLayout::default(), OutputDialect::FixedWidth);
        let f = fields(&out);
        assert_eq!(f.len(), 4 + FLAW_SLOTS + 3 + 3 + 1 + 9 + 1);
        assert_eq!(&f[..5], &["0", "5.000000e-01", "2", "1", "3.000000e-04"]);
        assert_eq!(f[5], "-1.000000e+00");
        assert_eq!(f[4 + FLAW_SLOTS - 1], "-1.000000e+00");
        assert_eq!(f[4 + FLAW_SLOTS], "1.000000e+00");
        assert_eq!(f[4 + FLAW_SLOTS + 6], "2.700000e+03");
    }

    #[test]
    fn test_fixed_width_rejects_too_many_flaws() {
        let mut p = sample();
        for i in 0..=FLAW_SLOTS {
            p.push_flaw(0, i as f64).unwrap();
        }
        let mut out = Vec::new();
        let err = write_particles(
            &mut out,
            &vec![p].into(),
            RecordLayout::default(),
            OutputDialect::FixedWidth,
        )
        .unwrap_err();
        assert!(matches!(err, Error::FlawSlotsExceeded { count: 41, .. }));
    }

    #[test]
    fn test_alternate_record() {
        let mut p = sample();
        p.push_flaw(0, 3.0e-4).unwrap();
        let out = render(&vec![p].into(), RecordLayout::default(), OutputDialect::Alternate);
        let f = fields(&out);
        assert_eq!(f.len(), 3 + 3 + 5 + 9 + 1 + FLAW_SLOTS);
        assert_eq!(f[9], "2.000000e+00");
        assert_eq!(f[20], "1.000000e+00");
        assert_eq!(f[21], "3.000000e-04");
        assert_eq!(f[22], "-1.0");
        assert_eq!(*f.last().unwrap(), "-1.0");
    }

    #[test]
    fn test_every_record_ends_with_tab_newline() {
        let store: ParticleStore = vec![sample(), sample()].into();
        for dialect in [
            OutputDialect::Plain,
            OutputDialect::FixedWidth,
            OutputDialect::Alternate,
        ] {
            let out = render(&store, RecordLayout::default(), dialect);
            assert_eq!(out.lines().count(), 2);
            assert!(out.ends_with("\t\n"));
        }
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(OutputDialect::Plain.to_string(), "plain");
        assert_eq!(OutputDialect::FixedWidth.to_string(), "fixed");
        assert_eq!(OutputDialect::Alternate.to_string(), "alternate");
    }
}
