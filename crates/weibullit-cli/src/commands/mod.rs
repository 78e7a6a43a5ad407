pub mod distribute;
pub mod plan;

use std::fs::File;

use clap::{Args, ValueEnum};
use weibullit_core::{
    DEFAULT_MAX_FLAWS, DEFAULT_SEED, MaterialFilter, OutputDialect, ParticleStore, RecordLayout,
    WeibullConfig, WeibullParams, read_particles,
};

/// Where the particles come from and which optional fields they carry.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Input file (default: stdin)
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Read at most this many particles
    #[arg(short, long)]
    pub number: Option<usize>,

    /// Records carry porosity distension and pressure; volumes use mass / (alpha density)
    #[arg(short = 'P', long)]
    pub porous: bool,

    /// Records carry plastic strain and temperature
    #[arg(short = 'S', long)]
    pub plastic_strain: bool,

    /// Records carry smoothing length and neighbour count (not supported)
    #[arg(short, long)]
    pub restarted: bool,
}

impl InputArgs {
    pub fn layout(&self) -> RecordLayout {
        RecordLayout {
            restarted: self.restarted,
            plasticity: self.plastic_strain,
            porous: self.porous,
        }
    }
}

/// Weibull constants and distribution settings.
#[derive(Args, Debug)]
pub struct WeibullArgs {
    /// Weibull constant k
    #[arg(short = 'k', long, required_unless_present = "basalt")]
    pub constant_k: Option<f64>,

    /// Weibull modulus m
    #[arg(short = 'm', long, required_unless_present = "basalt")]
    pub constant_m: Option<f64>,

    /// Use the basalt constants (k = 5e34, m = 8.5); overrides -k and -m
    #[arg(short = 'B', long)]
    pub basalt: bool,

    /// Only weibull particles of this material type (negative: all)
    #[arg(short = 't', long, allow_negative_numbers = true)]
    pub material_type: Option<i32>,

    /// Random seed (>= 1)
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum number of flaws per particle
    #[arg(short = 'M', long, default_value_t = DEFAULT_MAX_FLAWS)]
    pub max: usize,

    /// Total volume of the weibulled material (default: sum of mass / density)
    #[arg(short = 'A', long = "volume")]
    pub volume: Option<f64>,
}

impl WeibullArgs {
    /// Build the run configuration. `porous` comes from the input layout.
    pub fn config(&self, porous: bool) -> WeibullConfig {
        let params = match (self.basalt, self.constant_k, self.constant_m) {
            (true, k, m) => {
                if k.is_some() || m.is_some() {
                    log::warn!("--basalt given, ignoring -k/-m");
                }
                WeibullParams::BASALT
            }
            (false, Some(k), Some(m)) => WeibullParams::new(k, m),
            _ => fail("either --basalt or both -k and -m are required"),
        };
        let mut config = WeibullConfig::new(params);
        config.max_flaws_per_particle = self.max;
        config.seed = self.seed;
        config.target_volume = self.volume;
        config.porous = porous;
        config.material_filter = self
            .material_type
            .map_or(MaterialFilter::All, MaterialFilter::from_material_type);
        config
    }
}

/// Read the particles from the input file or stdin, exiting on failure.
pub fn load_particles(input: &InputArgs) -> ParticleStore {
    let layout = input.layout();
    let result = match input.filename.as_deref() {
        Some(path) => match File::open(path) {
            Ok(file) => read_particles(file, layout, input.number),
            Err(e) => fail(format!("cannot open {path}: {e}")),
        },
        None => read_particles(std::io::stdin().lock(), layout, input.number),
    };
    result.unwrap_or_else(|e| fail(e))
}

/// Output record format on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Input field order, then the thresholds
    Plain,
    /// Index, mass, material and 40 threshold slots first
    Fixed,
    /// All fields as floats, thresholds padded to 40 slots
    Alternate,
}

impl From<Format> for OutputDialect {
    fn from(format: Format) -> Self {
        match format {
            Format::Plain => OutputDialect::Plain,
            Format::Fixed => OutputDialect::FixedWidth,
            Format::Alternate => OutputDialect::Alternate,
        }
    }
}

/// Print the error and exit with status 1.
pub fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}
