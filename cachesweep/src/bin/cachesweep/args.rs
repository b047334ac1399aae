//! Arguments

// Imports
use {
	cachesweep::{AccessKind, CacheModel, Dimension, SweepPoint},
	std::path::PathBuf,
};

/// Arguments
#[derive(Debug)]
#[derive(clap::Parser)]
pub struct Args {
	/// Log file
	///
	/// Specifies a file to perform verbose logging to.
	/// You can use `RUST_LOG_FILE` to set filtering options
	#[clap(long = "log-file")]
	pub log_file: Option<PathBuf>,

	/// Whether to append to the log file
	#[clap(long = "log-file-append")]
	pub log_file_append: bool,

	/// Sub-command
	#[command(subcommand)]
	pub sub_cmd: SubCmd,
}

/// Sub-command
#[derive(Debug, clap::Subcommand)]
pub enum SubCmd {
	#[clap(name = "run")]
	Run(Run),

	#[clap(name = "report")]
	Report(Report),

	#[clap(name = "compare")]
	Compare(Compare),

	#[clap(name = "averages")]
	Averages(Averages),
}

/// Runs a sweep
#[derive(Debug, clap::Args)]
pub struct Run {
	/// Config file
	#[clap(long = "config")]
	pub config_file: PathBuf,
}

/// Reports on a telemetry file, or all telemetry files within a directory
#[derive(Debug, clap::Args)]
pub struct Report {
	/// Input file or directory
	pub input: PathBuf,

	/// Whether the telemetry is branch prediction telemetry
	#[clap(long = "branch")]
	pub branch: bool,
}

/// Compares miss rates along a free dimension, for rendering
#[derive(Debug, clap::Args)]
pub struct Compare {
	/// Sweep results root
	#[clap(long = "root")]
	pub root: PathBuf,

	/// Free dimension
	#[clap(long = "free", value_enum)]
	pub free: Dimension,

	/// Pinned log number of rows
	#[clap(long = "log-num-rows")]
	pub log_num_rows: Option<u32>,

	/// Pinned log block size
	#[clap(long = "log-block-size")]
	pub log_block_size: Option<u32>,

	/// Pinned associativity
	#[clap(long = "associativity")]
	pub associativity: Option<u32>,

	/// Cache model
	#[clap(long = "model", value_enum, default_value_t = CacheModel::Pipt)]
	pub model: CacheModel,

	/// Access kind
	#[clap(long = "kind", value_enum, default_value_t = AccessKind::Total)]
	pub kind: AccessKind,

	/// Output file
	///
	/// If not specified, outputs to stdout.
	#[clap(short = 'o', long = "output")]
	pub output_file: Option<PathBuf>,
}

/// Averages each cache model's miss rate across all benchmarks of a sweep point
#[derive(Debug, clap::Args)]
pub struct Averages {
	/// Sweep results root
	#[clap(long = "root")]
	pub root: PathBuf,

	/// Sweep point, as `<log rows>_<log block size>_<associativity>`
	#[clap(long = "point")]
	pub point: SweepPoint,

	/// Access kind
	#[clap(long = "kind", value_enum, default_value_t = AccessKind::Total)]
	pub kind: AccessKind,
}
