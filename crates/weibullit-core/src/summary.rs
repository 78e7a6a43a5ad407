//! Machine-readable record of a weibulling run.
//!
//! Written next to the weibulled snapshot as a small JSON document so a run
//! can be audited or reproduced later: which constants, which seed, which
//! filter, and what the distributor ended up doing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{OutputDialect, RecordLayout};
use crate::config::{WeibullConfig, WeibullParams};
use crate::distribute::DistributionReport;
use crate::error::{Error, Result};

/// Current summary format version.
pub const SUMMARY_VERSION: u32 = 1;

/// Contents of a run summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: u32,
    pub weibullit_version: String,
    /// Input path, or `None` for stdin.
    pub input: Option<String>,
    /// Output path, or `None` for stdout.
    pub output: Option<String>,
    pub layout: RecordLayout,
    pub dialect: OutputDialect,
    pub params: WeibullParams,
    pub max_flaws_per_particle: usize,
    /// Material type filtered on, `None` for all particles.
    pub material_type: Option<i32>,
    pub report: DistributionReport,
}

impl RunSummary {
    pub fn new(
        config: &WeibullConfig,
        layout: RecordLayout,
        dialect: OutputDialect,
        report: DistributionReport,
    ) -> Self {
        Self {
            version: SUMMARY_VERSION,
            weibullit_version: crate::VERSION.to_string(),
            input: None,
            output: None,
            layout,
            dialect,
            params: config.params,
            max_flaws_per_particle: config.max_flaws_per_particle,
            material_type: config.material_filter.material_type(),
            report,
        }
    }

    pub fn with_paths(mut self, input: Option<&str>, output: Option<&str>) -> Self {
        self.input = input.map(str::to_string);
        self.output = output.map(str::to_string);
        self
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Io(e.into()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::Io(e.into()))
    }
}
