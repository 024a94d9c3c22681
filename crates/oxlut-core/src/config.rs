//! Conversion options
//!
//! [`ConvertOptions`] is plain data: it deserializes from JSON, and every
//! field has a default so partial config files work. [`ConvertOptions::validate`]
//! resolves names and rejects contradictory settings before any file is
//! touched.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calibration::InsertionPoint;
use crate::colorspace::Primaries;
use crate::error::{Error, Result};
use crate::icc::{DateTimeNumber, RenderingIntent};
use crate::lut3d::MAX_ICC_GRID_POINTS;
use crate::lut_file::LutFormat;
use crate::resample::{DEFAULT_CHUNK_SIZE, Interpolation};

/// Default target resolution
pub const DEFAULT_SIZE: usize = 65;

/// Largest target resolution
pub const MAX_SIZE: usize = 256;

/// Settings for a conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertOptions {
    /// Source grids, processed in order
    pub inputs: Vec<PathBuf>,
    /// Output path; only valid with a single input
    pub output: Option<PathBuf>,
    /// Directory for derived output names (default: next to each input)
    pub output_dir: Option<PathBuf>,
    /// Format for derived output names
    pub format: LutFormat,
    /// Where to keep the intermediate device link
    pub intermediate: Option<PathBuf>,
    /// Source primaries, converted to BT.709
    pub colorspace: Option<String>,
    /// Convert from BT.709 to `colorspace` instead
    pub inverse_matrix: bool,
    /// Mark output as HDR; requires BT.2020 primaries
    pub hdr: bool,
    /// Encode output in video levels (16–235)
    pub video_levels: bool,
    /// Apply the video levels to the input coordinates before interpolation
    pub video_levels_input: bool,
    /// Replace the source samples with the identity mapping
    pub unity: bool,
    /// Target resolution per axis
    pub size: usize,
    pub interpolation: Interpolation,
    /// Calibration file (`.cal` or 4-column text)
    pub calibration: Option<PathBuf>,
    pub calibration_at: InsertionPoint,
    pub description: Option<String>,
    pub copyright: Option<String>,
    pub unicode_description: bool,
    pub rendering_intent: RenderingIntent,
    /// Fixed RFC 3339 creation time for reproducible profiles
    pub creation_time: Option<String>,
    pub parallel: bool,
    pub chunk_size: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: None,
            output_dir: None,
            format: LutFormat::Binary,
            intermediate: None,
            colorspace: None,
            inverse_matrix: false,
            hdr: false,
            video_levels: false,
            video_levels_input: false,
            unity: false,
            size: DEFAULT_SIZE,
            interpolation: Interpolation::default(),
            calibration: None,
            calibration_at: InsertionPoint::default(),
            description: None,
            copyright: None,
            unicode_description: false,
            rendering_intent: RenderingIntent::default(),
            creation_time: None,
            parallel: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ConvertOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parsed primaries, if any
    pub fn primaries(&self) -> Result<Option<Primaries>> {
        self.colorspace
            .as_deref()
            .map(Primaries::from_name)
            .transpose()
    }

    /// Parsed fixed creation time, if any
    pub fn creation_date(&self) -> Result<Option<DateTimeNumber>> {
        self.creation_time
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| DateTimeNumber::from_datetime(&dt.with_timezone(&Utc)))
                    .map_err(|e| Error::Config(format!("creation time '{}': {}", s, e)))
            })
            .transpose()
    }

    /// Output format of one destination path
    pub fn output_format(&self, path: &Path) -> Result<LutFormat> {
        LutFormat::from_path(path).ok_or_else(|| {
            Error::Config(format!(
                "unrecognized output extension: {}",
                path.display()
            ))
        })
    }

    /// Destination for one input
    ///
    /// Derived names are `<stem>.<ext>` next to the input or in
    /// `output_dir`. When that would be the input itself, the target size
    /// goes into the name: `<stem>.<size>.<ext>`.
    pub fn output_for(&self, input: &Path) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let dir = match (&self.output_dir, input.parent()) {
            (Some(dir), _) => dir.as_path(),
            (None, Some(parent)) => parent,
            (None, None) => Path::new(""),
        };
        let named = |suffix: String| {
            let mut name = stem.to_os_string();
            name.push(suffix);
            dir.join(name)
        };
        let derived = named(format!(".{}", self.format.extension()));
        if !same_file(&derived, input) {
            return derived;
        }
        named(format!(".{}.{}", self.size, self.format.extension()))
    }

    /// Where one input's intermediate device link goes, if kept
    ///
    /// A batch keys the configured name by input stem so every input keeps
    /// its own profile: `link.icc` becomes `link.<stem>.icc`.
    pub fn intermediate_for(&self, input: &Path) -> Option<PathBuf> {
        let path = self.intermediate.as_ref()?;
        if self.inputs.len() <= 1 {
            return Some(path.clone());
        }
        let base = path.file_stem().unwrap_or(path.as_os_str());
        let input_stem = input.file_stem().unwrap_or(input.as_os_str());
        let mut name = base.to_os_string();
        name.push(".");
        name.push(input_stem);
        if let Some(ext) = path.extension() {
            name.push(".");
            name.push(ext);
        }
        Some(path.with_file_name(name))
    }

    /// Reject contradictory or out-of-range settings
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Config("no input files".to_string()));
        }
        if self.output.is_some() && self.inputs.len() > 1 {
            return Err(Error::Config(
                "an explicit output path needs exactly one input".to_string(),
            ));
        }
        if !(2..=MAX_SIZE).contains(&self.size) {
            return Err(Error::Config(format!(
                "target size {} is outside 2..={}",
                self.size, MAX_SIZE
            )));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk size must be positive".to_string()));
        }
        if self.video_levels_input && !self.video_levels {
            return Err(Error::Config(
                "video levels before interpolation need video levels enabled".to_string(),
            ));
        }

        let primaries = self.primaries()?;
        if self.hdr {
            if let Some(p) = primaries.filter(|&p| p != Primaries::Bt2020) {
                return Err(Error::Config(format!(
                    "HDR output needs BT2020 primaries, not {}",
                    p
                )));
            }
        }
        self.creation_date()?;

        if let Some(intermediate) = &self.intermediate {
            if self.output_format(intermediate)? != LutFormat::Icc {
                return Err(Error::Config(format!(
                    "intermediate profile must be .icc or .icm: {}",
                    intermediate.display()
                )));
            }
        }

        let mut written: Vec<PathBuf> = Vec::new();
        for input in &self.inputs {
            let output = self.output_for(input);
            let format = self.output_format(&output)?;
            if format == LutFormat::Icc && self.size > MAX_ICC_GRID_POINTS {
                return Err(Error::Config(format!(
                    "ICC output holds at most {} grid points, size is {}",
                    MAX_ICC_GRID_POINTS, self.size
                )));
            }
            written.push(output);
            written.extend(self.intermediate_for(input));
        }
        for (n, path) in written.iter().enumerate() {
            if let Some(input) = self.inputs.iter().find(|i| same_file(path, i)) {
                return Err(Error::Config(format!(
                    "output {} would overwrite input {}",
                    path.display(),
                    input.display()
                )));
            }
            if written[..n].iter().any(|p| same_file(p, path)) {
                return Err(Error::Config(format!(
                    "{} is written more than once",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Absolute form of a path whose file may not exist yet
fn resolved(path: &Path) -> PathBuf {
    if let Ok(path) = fs::canonicalize(path) {
        return path;
    }
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || resolved(a) == resolved(b)
}
