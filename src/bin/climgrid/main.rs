//! Command line front end: extract SILO or NASA POWER daily climate data for a
//! lat/lon grid and write APSIM, DSSAT or CSV files, or download raw SILO grids.
use clap::{Args, Parser, Subcommand};
use climgrid::{
    default_download_dir, resolve_years, ClimateError, ClimateExtractor, ClimateVariable,
    CoordinateSpec, OutputFormat, Provider, ResolveError,
};
use log::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    action: Action,

    /// More logging; repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Extract climate data and write it as MET, WTH or CSV files.
    Generate(GenerateArgs),
    /// Download SILO grids for every requested variable and year.
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
struct RequestArgs {
    /// A year or an inclusive range, e.g. 2015 or 2000-2010.
    #[arg(short = 'y', long = "years")]
    years: String,

    /// Climate variables, e.g. daily_rain max_temp min_temp radiation.
    #[arg(short = 'c', long = "climate-variables", num_args = 1.., required = true)]
    variables: Vec<ClimateVariable>,

    /// Data provider: silo or nasapower.
    #[arg(short = 's', long = "source", default_value = "silo")]
    provider: Provider,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// A latitude, or two to walk the provider grid between them.
    #[arg(long, num_args = 1..=2, allow_negative_numbers = true, conflicts_with = "lat_file")]
    lat: Option<Vec<f64>>,

    /// File with one latitude per line.
    #[arg(long)]
    lat_file: Option<PathBuf>,

    /// A longitude, or two to walk the provider grid between them.
    #[arg(long, num_args = 1..=2, allow_negative_numbers = true, conflicts_with = "lon_file")]
    lon: Option<Vec<f64>>,

    /// File with one longitude per line.
    #[arg(long)]
    lon_file: Option<PathBuf>,

    /// Directory (or single file) of local SILO grids to read instead of the bucket.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Output directory.
    #[arg(short = 'o', long = "output", default_value = ".")]
    output: PathBuf,

    /// Output format: met, wth, csv or stdout.
    #[arg(short = 't', long = "output-type", default_value = "met")]
    format: OutputFormat,

    /// Split the work across parallel workers.
    #[arg(short = 'm', long = "multiprocessing")]
    parallel: bool,

    /// Worker limit in parallel mode.
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, Args)]
struct DownloadArgs {
    #[command(flatten)]
    request: RequestArgs,

    /// Destination directory, defaults to the user cache directory.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();

    match run(cli.action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClimateError::EmptyResult) => {
            eprintln!("No data was found for any of the requested coordinates.");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(action: Action) -> Result<(), ClimateError> {
    match action {
        Action::Generate(args) => {
            let years = resolve_years(&args.request.years)?;
            let latitudes = coordinate_spec(args.lat, args.lat_file, "latitude")?;
            let longitudes = coordinate_spec(args.lon, args.lon_file, "longitude")?;

            let extractor = ClimateExtractor::builder()
                .provider(args.request.provider)
                .variables(args.request.variables)
                .years(years)
                .latitudes(latitudes)
                .longitudes(longitudes)
                .maybe_archive_dir(args.input)
                .parallel(args.parallel)
                .maybe_workers(args.workers)
                .build();

            let files = extractor.generate(args.format, &args.output).await?;
            if args.format != OutputFormat::Stdout {
                let output = args.output.display();
                println!("Wrote {} {} files to {}", files.len(), args.format, output);
            }
        }
        Action::Download(args) => {
            let years = resolve_years(&args.request.years)?;
            let output = match args.output {
                Some(dir) => dir,
                None => default_download_dir().map_err(|e| ClimateError::Io(PathBuf::new(), e))?,
            };

            let extractor = ClimateExtractor::builder()
                .provider(args.request.provider)
                .variables(args.request.variables)
                .years(years)
                .build();

            let files = extractor.download(&output).await?;
            println!("{} grids available in {}", files.len(), output.display());
        }
    }
    Ok(())
}

fn coordinate_spec(
    values: Option<Vec<f64>>,
    file: Option<PathBuf>,
    axis: &'static str,
) -> Result<CoordinateSpec, ResolveError> {
    match (values, file) {
        (_, Some(path)) => CoordinateSpec::from_file(&path),
        (Some(values), None) => match values.as_slice() {
            [single] => Ok(CoordinateSpec::Single(*single)),
            [start, end] => Ok(CoordinateSpec::Span(*start, *end)),
            _ => Err(ResolveError::EmptySpec(axis)),
        },
        (None, None) => Err(ResolveError::EmptySpec(axis)),
    }
}
