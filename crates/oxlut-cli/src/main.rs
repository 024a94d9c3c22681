use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use oxlut_core::{
    AbortSignal, ConvertOptions, Error, ErrorKind, InsertionPoint, Interpolation, LutFormat,
    Pipeline,
};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oxlut")]
#[command(version, about = "Convert sampled 3D LUTs into device links and resampled LUT files", long_about = None)]
struct Cli {
    /// Grid files: text rows, .cube, .3dlut or a device-link .icc
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (.icc/.icm, .cube, .3dlut/.bin); single input only
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for outputs named after each input
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Format for outputs named after each input
    #[arg(long, value_parser = parse_format)]
    format: Option<LutFormat>,

    /// JSON options file; flags given here take precedence
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,

    /// Source primaries: BT709, SMPTE_C, EBU_PAL, BT2020, DCI_P3
    #[arg(long)]
    colorspace: Option<String>,

    /// Convert from BT.709 into the given primaries instead
    #[arg(long)]
    inverse_matrix: bool,

    /// Mark the output as HDR (BT.2020 only)
    #[arg(long)]
    hdr: bool,

    /// Encode output in video levels (16-235)
    #[arg(long)]
    video_levels: bool,

    /// Apply video levels to the input coordinates before interpolation
    #[arg(long)]
    video_levels_input: bool,

    /// Replace the source samples with the identity mapping
    #[arg(long)]
    unity: bool,

    /// Target grid points per axis
    #[arg(short, long)]
    size: Option<usize>,

    /// trilinear, tetrahedral or nearest
    #[arg(long)]
    interpolation: Option<Interpolation>,

    /// Calibration curves (.cal or 4-column text)
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Insert the calibration at the LUT input or output
    #[arg(long)]
    calibration_at: Option<InsertionPoint>,

    /// Keep the intermediate device link at this path (`name.<input stem>.icc` in a batch)
    #[arg(long)]
    intermediate: Option<PathBuf>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    copyright: Option<String>,

    /// Also store the description as UTF-16
    #[arg(long)]
    unicode: bool,

    /// Fixed RFC 3339 creation time
    #[arg(long)]
    creation_time: Option<String>,

    /// Resample on the current thread only
    #[arg(long)]
    single_threaded: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_format(s: &str) -> Result<LutFormat, String> {
    LutFormat::from_path(format!("x.{}", s.trim_start_matches('.')))
        .ok_or_else(|| format!("unknown format '{}'", s))
}

impl Cli {
    /// Options from the config file, overridden by flags
    fn options(&self) -> anyhow::Result<ConvertOptions> {
        let mut o = match &self.config {
            Some(path) => ConvertOptions::from_json_path(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ConvertOptions::default(),
        };

        o.inputs = self.inputs.clone();
        if self.output.is_some() {
            o.output = self.output.clone();
        }
        if self.output_dir.is_some() {
            o.output_dir = self.output_dir.clone();
        }
        if let Some(format) = self.format {
            o.format = format;
        }
        if self.colorspace.is_some() {
            o.colorspace = self.colorspace.clone();
        }
        if self.intermediate.is_some() {
            o.intermediate = self.intermediate.clone();
        }
        if self.calibration.is_some() {
            o.calibration = self.calibration.clone();
        }
        if self.description.is_some() {
            o.description = self.description.clone();
        }
        if self.copyright.is_some() {
            o.copyright = self.copyright.clone();
        }
        if self.creation_time.is_some() {
            o.creation_time = self.creation_time.clone();
        }
        if let Some(size) = self.size {
            o.size = size;
        }
        if let Some(interpolation) = self.interpolation {
            o.interpolation = interpolation;
        }
        if let Some(at) = self.calibration_at {
            o.calibration_at = at;
        }
        o.inverse_matrix |= self.inverse_matrix;
        o.hdr |= self.hdr;
        o.video_levels |= self.video_levels;
        o.video_levels_input |= self.video_levels_input;
        o.unity |= self.unity;
        o.unicode_description |= self.unicode;
        if self.single_threaded {
            o.parallel = false;
        }
        Ok(o)
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Config | ErrorKind::Validation => 1,
        ErrorKind::Format | ErrorKind::Dimension => 2,
        ErrorKind::Io => 3,
        ErrorKind::Aborted => 130,
    }
}

fn run(cli: &Cli, abort: AbortSignal) -> anyhow::Result<()> {
    let options = cli.options()?;
    let pipeline = Pipeline::new(options)?.with_abort_signal(abort);
    let reports = pipeline.run()?;
    for report in &reports {
        info!(
            input = %report.input.display(),
            output = %report.output.display(),
            from = report.source_size,
            to = report.target_size,
            "done"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let abort = AbortSignal::new();
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, abort.flag()) {
            error!(signal, %err, "cannot install signal handler");
            return ExitCode::from(exit_code(ErrorKind::Io));
        }
    }

    match run(&cli, abort) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = match err.downcast_ref::<Error>() {
                Some(e) => exit_code(e.kind()),
                None => 1,
            };
            ExitCode::from(code)
        }
    }
}
