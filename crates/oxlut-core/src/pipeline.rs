//! Conversion pipeline
//!
//! One conversion runs these stages, each producing a new value:
//!
//! 1. load the source grid (text rows, `.cube`, `3DLT` or a device link)
//! 2. wrap it in a device link and decode it back (16-bit quantization)
//! 3. resample to the target resolution
//! 4. primaries matrix and output levels
//! 5. calibration curves
//! 6. encode and write the output atomically
//!
//! [`Pipeline::new`] validates options and loads the calibration before any
//! file is written. In a batch, an abort stops at the current file; outputs
//! already written stay in place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::calibration::{CalibrationAppender, CalibrationCurve};
use crate::colorspace::{ColorspaceTransform, LevelMapping};
use crate::config::ConvertOptions;
use crate::devicelink::DeviceLinkBuilder;
use crate::error::{Error, Result};
use crate::grid::{ColorGrid, GridReader};
use crate::icc::{DateTimeNumber, IccProfile};
use crate::lut3d::{Lut3d, MAX_ICC_GRID_POINTS};
use crate::lut_file::{BinaryLut, LutFormat, decode_cube, encode_cube};
use crate::resample::GridResampler;

/// Outcome of one converted file
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub source_size: usize,
    pub target_size: usize,
    pub format: LutFormat,
}

/// Validated options plus everything loaded up front
#[derive(Debug)]
pub struct Pipeline {
    options: ConvertOptions,
    transform: Option<ColorspaceTransform>,
    appender: CalibrationAppender,
    creation_date: Option<DateTimeNumber>,
    abort: AbortSignal,
}

impl Pipeline {
    pub fn new(options: ConvertOptions) -> Result<Self> {
        options.validate()?;

        let mut transform = None;
        if let Some(primaries) = options.primaries()? {
            transform =
                Some(ColorspaceTransform::new().with_primaries(primaries, options.inverse_matrix)?);
        }
        if options.video_levels && !options.video_levels_input {
            transform = Some(
                transform
                    .unwrap_or_default()
                    .with_levels(LevelMapping::FullToVideo),
            );
        }

        let mut appender = CalibrationAppender::new().with_insertion_point(options.calibration_at);
        if let Some(path) = &options.calibration {
            appender = appender.with_curve(CalibrationCurve::read_path(path)?);
        }

        let creation_date = options.creation_date()?;
        Ok(Self {
            options,
            transform,
            appender,
            creation_date,
            abort: AbortSignal::new(),
        })
    }

    /// Share an externally raised abort flag
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    fn device_link(&self, description: String) -> DeviceLinkBuilder {
        let mut builder = DeviceLinkBuilder::new()
            .with_description(description)
            .with_unicode_description(self.options.unicode_description)
            .with_rendering_intent(self.options.rendering_intent);
        if let Some(copyright) = &self.options.copyright {
            builder = builder.with_copyright(copyright.clone());
        }
        if let Some(date) = self.creation_date {
            builder = builder.with_creation_date(date);
        }
        builder
    }

    fn description_for(&self, input: &Path) -> String {
        let base = match &self.options.description {
            Some(d) => d.clone(),
            None => {
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "grid".to_string());
                match self.options.primaries() {
                    Ok(Some(p)) => format!("{} ({})", stem, p),
                    _ => stem,
                }
            }
        };
        if self.options.hdr {
            format!("{} HDR", base)
        } else {
            base
        }
    }

    /// Convert every input in order
    pub fn run(&self) -> Result<Vec<ConvertReport>> {
        let mut reports = Vec::with_capacity(self.options.inputs.len());
        for input in &self.options.inputs {
            let output = self.options.output_for(input);
            match self.convert(input, &output) {
                Ok(report) => reports.push(report),
                Err(Error::Aborted) => {
                    warn!(
                        input = %input.display(),
                        completed = reports.len(),
                        "batch aborted"
                    );
                    return Err(Error::Aborted);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reports)
    }

    /// Convert one file
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConvertReport> {
        self.abort.check()?;
        let format = self.options.output_format(output)?;
        info!(input = %input.display(), output = %output.display(), "converting");

        let source = load_source(input)?;
        let source_size = source.size();
        let description = self.description_for(input);
        let intermediate = self.options.intermediate_for(input);
        let lut = self.process(source, &description, intermediate.as_deref())?;

        let bytes = match format {
            LutFormat::Icc => self.device_link(description).encode(&lut)?,
            LutFormat::Cube => encode_cube(&lut.bake(), Some(&description)).into_bytes(),
            LutFormat::Binary => BinaryLut::new(lut.bake())
                .with_hdr(self.options.hdr)
                .encode()?,
        };
        self.abort.check()?;
        write_atomic(output, &bytes)?;
        info!(
            output = %output.display(),
            bytes = bytes.len(),
            size = lut.grid.size(),
            "wrote LUT"
        );

        Ok(ConvertReport {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            source_size,
            target_size: lut.grid.size(),
            format,
        })
    }

    /// Run the in-memory stages on a loaded grid
    ///
    /// `intermediate` keeps the round-tripped device link at that path.
    pub fn process(
        &self,
        source: ColorGrid,
        description: &str,
        intermediate: Option<&Path>,
    ) -> Result<Lut3d> {
        let source = if self.options.unity {
            debug!(size = source.size(), "replacing source with identity");
            ColorGrid::identity(source.size())?
        } else {
            source
        };

        let grid = self.round_trip(source, description, intermediate)?;

        let mut resampler = GridResampler::new(self.options.size)
            .with_interpolation(self.options.interpolation)
            .with_chunk_size(self.options.chunk_size)
            .with_parallel(self.options.parallel)
            .with_abort_signal(self.abort.clone());
        if self.options.video_levels && self.options.video_levels_input {
            resampler = resampler.with_input_levels(LevelMapping::VideoToFull);
        }
        let grid = resampler.resample(&grid)?;

        let grid = match &self.transform {
            Some(transform) => {
                info!(matrix = transform.matrix().is_some(), "applying colorspace transform");
                transform.apply_grid(&grid)
            }
            None => grid,
        };

        self.appender.append(&Lut3d::from_grid(grid))
    }

    /// Device link encode and decode, optionally keeping the profile
    fn round_trip(
        &self,
        source: ColorGrid,
        description: &str,
        intermediate: Option<&Path>,
    ) -> Result<ColorGrid> {
        if source.size() > MAX_ICC_GRID_POINTS {
            if intermediate.is_some() {
                return Err(Error::Validation(format!(
                    "source resolution {} does not fit an intermediate profile",
                    source.size()
                )));
            }
            debug!(size = source.size(), "source too large for a device link, skipping");
            return Ok(source);
        }

        let bytes = self
            .device_link(description.to_string())
            .encode(&Lut3d::from_grid(source))?;
        if let Some(path) = intermediate {
            write_atomic(path, &bytes)?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote intermediate profile");
        }
        let profile = IccProfile::parse(&bytes)?;
        Ok(Lut3d::from_profile(&profile)?.bake())
    }
}

/// Load a source grid, choosing the reader by extension
pub fn load_source(path: &Path) -> Result<ColorGrid> {
    let grid = match LutFormat::from_path(path) {
        Some(LutFormat::Cube) => decode_cube(&fs::read_to_string(path)?)?.grid,
        Some(LutFormat::Binary) => BinaryLut::decode(&fs::read(path)?)?.grid,
        Some(LutFormat::Icc) => {
            let profile = IccProfile::parse(&fs::read(path)?)?;
            Lut3d::from_profile(&profile)?.bake()
        }
        None => GridReader::new().read_path(path)?,
    };
    info!(path = %path.display(), size = grid.size(), "loaded source grid");
    Ok(grid)
}

/// Write through a temporary file in the destination directory, then rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn options(dir: &Path, output: &str) -> ConvertOptions {
        ConvertOptions {
            inputs: vec![dir.join("in.txt")],
            output: Some(dir.join(output)),
            size: 5,
            creation_time: Some("2020-01-01T00:00:00Z".to_string()),
            ..Default::default()
        }
    }

    fn write_identity_rows(path: &Path, size: usize) {
        // Source nesting: B outer, R middle, G inner
        let max = (size - 1) as f64;
        let mut text = String::new();
        for b in 0..size {
            for r in 0..size {
                for g in 0..size {
                    text.push_str(&format!(
                        "{} {} {}\n",
                        r as f64 / max,
                        g as f64 / max,
                        b as f64 / max
                    ));
                }
            }
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_convert_identity_to_cube() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_rows(&dir.path().join("in.txt"), 3);

        let reports = Pipeline::new(options(dir.path(), "out.cube"))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].source_size, 3);
        assert_eq!(reports[0].target_size, 5);

        let text = fs::read_to_string(dir.path().join("out.cube")).unwrap();
        let cube = decode_cube(&text).unwrap();
        let identity = ColorGrid::identity(5).unwrap();
        assert!(cube.grid.max_abs_diff(&identity).unwrap() < 1e-4);
        assert_eq!(cube.title.as_deref(), Some("in"));
    }

    #[test]
    fn test_intermediate_and_icc_output() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_rows(&dir.path().join("in.txt"), 2);
        let mut opts = options(dir.path(), "out.icc");
        opts.intermediate = Some(dir.path().join("link.icm"));
        opts.description = Some("Test link".to_string());

        Pipeline::new(opts).unwrap().run().unwrap();

        let link = IccProfile::parse(&fs::read(dir.path().join("link.icm")).unwrap()).unwrap();
        assert_eq!(link.a2b0().unwrap().grid_points, 2);
        let out = IccProfile::parse(&fs::read(dir.path().join("out.icc")).unwrap()).unwrap();
        assert_eq!(out.a2b0().unwrap().grid_points, 5);
        assert_eq!(out.description().as_deref(), Some("Test link"));
    }

    #[test]
    fn test_batch_keeps_one_intermediate_per_input() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_rows(&dir.path().join("a.txt"), 2);
        write_identity_rows(&dir.path().join("b.txt"), 3);
        let opts = ConvertOptions {
            inputs: vec![dir.path().join("a.txt"), dir.path().join("b.txt")],
            intermediate: Some(dir.path().join("link.icc")),
            size: 5,
            ..Default::default()
        };

        Pipeline::new(opts).unwrap().run().unwrap();

        assert!(!dir.path().join("link.icc").exists());
        for (stem, size) in [("a", 2), ("b", 3)] {
            let path = dir.path().join(format!("link.{}.icc", stem));
            let link = IccProfile::parse(&fs::read(path).unwrap()).unwrap();
            assert_eq!(link.a2b0().unwrap().grid_points, size);
        }
    }

    #[test]
    fn test_bad_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let rows: String = (0..100).map(|_| "0.1 0.2 0.3\n").collect();
        fs::write(dir.path().join("in.txt"), rows).unwrap();

        let err = Pipeline::new(options(dir.path(), "out.3dlut"))
            .unwrap()
            .run()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimension);
        assert!(!dir.path().join("out.3dlut").exists());
    }

    #[test]
    fn test_aborted_before_start() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_rows(&dir.path().join("in.txt"), 2);
        let abort = AbortSignal::new();
        abort.raise();

        let err = Pipeline::new(options(dir.path(), "out.3dlut"))
            .unwrap()
            .with_abort_signal(abort)
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Aborted));
        assert!(!dir.path().join("out.3dlut").exists());
    }

    #[test]
    fn test_hdr_flag_and_description() {
        let dir = tempfile::tempdir().unwrap();
        write_identity_rows(&dir.path().join("in.txt"), 2);
        let mut opts = options(dir.path(), "out.3dlut");
        opts.hdr = true;
        opts.colorspace = Some("BT2020".to_string());

        let pipeline = Pipeline::new(opts).unwrap();
        assert_eq!(pipeline.description_for(Path::new("in.txt")), "in (BT2020) HDR");
        pipeline.run().unwrap();

        let lut = BinaryLut::decode(&fs::read(dir.path().join("out.3dlut")).unwrap()).unwrap();
        assert!(lut.hdr);
        assert_eq!(lut.grid.size(), 5);
    }

    #[test]
    fn test_missing_calibration_fails_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), "out.3dlut");
        opts.calibration = Some(dir.path().join("missing.cal"));
        let err = Pipeline::new(opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
