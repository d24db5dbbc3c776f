//! localcorr CLI
//!
//! Correlates the time series of each pixel in an image volume with the mean
//! time series of its local neighborhood.
//!
//! ```text
//! localcorr <target> <input> <output> <radius> <max-x> <max-y> [options]
//! localcorr local data/fish.txt results 5 88 76
//! ```
//!
//! Results are written to `<output>-localcorr` as `x`, `y` and `corr`
//! artifacts whose entries line up positionally.

use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use localcorr::prelude::*;

mod error;

pub use error::CliExitCode;

/// Correlate each pixel's time series with its local neighborhood mean
#[derive(Parser, Debug)]
#[command(name = "localcorr")]
#[command(version)]
#[command(about = "Correlate each pixel's time series with its local neighborhood mean")]
struct Cli {
    /// Execution target: local, local[N] or local[*]
    #[arg(value_parser = clap::value_parser!(ConnectionTarget))]
    target: ConnectionTarget,

    /// Input file, one record per line
    input: PathBuf,

    /// Output directory prefix; results go to <OUTPUT>-localcorr
    output: PathBuf,

    /// Neighborhood half-width
    radius: usize,

    /// Volume extent along x
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    max_x: i64,

    /// Volume extent along y
    #[arg(value_parser = clap::value_parser!(i64).range(1..))]
    max_y: i64,

    /// Artifact format
    #[arg(long, value_enum, default_value_t = FormatArg::Mat)]
    format: FormatArg,

    /// Layout of the key columns
    #[arg(long, value_enum, default_value_t = KeyFormatArg::Xyz)]
    key_format: KeyFormatArg,

    /// Per-series preprocessing
    #[arg(long, value_enum, default_value_t = PreprocessArg::Raw)]
    preprocess: PreprocessArg,

    /// Divisor for neighborhood means
    #[arg(long, value_enum, default_value_t = NormalizationArg::WindowArea)]
    normalization: NormalizationArg,

    /// Partitions for the reduction and the join (default: worker count)
    #[arg(
        long,
        conflicts_with = "stream",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    partitions: Option<u64>,

    /// Force evaluation of the neighborhood expansion before reducing
    #[arg(long, conflicts_with = "stream")]
    barrier: bool,

    /// Read the input in chunks with the streaming adapter
    #[arg(long)]
    stream: bool,

    /// Records per chunk when streaming
    #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,

    /// Order results by plane, row, column before writing
    #[arg(long)]
    sort: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
    Mat,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Mat => OutputFormat::Mat,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyFormatArg {
    Xyz,
    Linear,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PreprocessArg {
    Raw,
    Sub,
    Dff,
}

impl From<PreprocessArg> for Preprocess {
    fn from(arg: PreprocessArg) -> Self {
        match arg {
            PreprocessArg::Raw => Preprocess::Raw,
            PreprocessArg::Sub => Preprocess::SubtractMean,
            PreprocessArg::Dff => Preprocess::DeltaF,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NormalizationArg {
    WindowArea,
    Contributions,
}

impl From<NormalizationArg> for Normalization {
    fn from(arg: NormalizationArg) -> Self {
        match arg {
            NormalizationArg::WindowArea => Normalization::WindowArea,
            NormalizationArg::Contributions => Normalization::ContributionCount,
        }
    }
}

impl Cli {
    fn parser(&self) -> RecordParser {
        let key_format = match self.key_format {
            KeyFormatArg::Xyz => KeyFormat::Xyz,
            KeyFormatArg::Linear => KeyFormat::Linear {
                max_x: self.max_x,
                max_y: self.max_y,
            },
        };
        RecordParser::new()
            .key_format(key_format)
            .preprocess(self.preprocess.into())
    }

    fn output_dir(&self) -> PathBuf {
        let mut name = self.output.clone().into_os_string();
        name.push("-localcorr");
        PathBuf::from(name)
    }

    fn base(&self) -> LocalCorr {
        LocalCorr::new()
            .radius(self.radius)
            .bounds(self.max_x, self.max_y)
            .normalization(self.normalization.into())
    }
}

fn run(cli: &Cli) -> Result<LocalCorrResult<f64>, LocalCorrError> {
    if cli.stream {
        let mut processor = cli
            .base()
            .adapter(Streaming)
            .chunk_size(cli.chunk_size as usize)
            .build::<f64>()?;

        let file = File::open(&cli.input).map_err(|e| LocalCorrError::io(&cli.input, e))?;
        let parser = cli.parser();

        let context = ExecutionContext::builder(cli.target)
            .app_name("localcorr")
            .open()?;
        let result = context.install(|| -> Result<LocalCorrResult<f64>, LocalCorrError> {
            let records = processor.process_lines(BufReader::new(file), &parser)?;
            info!(records, "input streamed");
            processor.finalize()
        });
        context.close();
        return result;
    }

    // Validate every parameter before the worker pool starts.
    let mut builder = cli.base().adapter(Batch).barrier(cli.barrier);
    if let Some(partitions) = cli.partitions {
        builder = builder.partitions(partitions as usize);
    }
    let processor = builder.build()?;

    let context = ExecutionContext::builder(cli.target)
        .app_name("localcorr")
        .open()?;
    let result = processor.fit(&context, TextInput::new(&cli.input, cli.parser()));
    context.close();
    result
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let outcome = run(&cli).and_then(|mut result| {
        if cli.sort {
            result.sort_by_coordinate();
        }
        emit(&result, &cli.output_dir(), cli.format.into())
    });

    match outcome {
        Ok(paths) => {
            info!(artifacts = paths.len(), dir = %cli.output_dir().display(), "done");
            CliExitCode::Success.into()
        }
        Err(err) => {
            error!(error = %err, "localcorr failed");
            eprintln!("localcorr: {err}");
            CliExitCode::from(&err).into()
        }
    }
}
