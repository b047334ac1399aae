//! Cache parameter sweep harness (`cachesweep`)

// Modules
mod args;

// Imports
use {
	self::args::{Args, SubCmd},
	anyhow::Context,
	cachesweep::{
		aggregate::Telemetry,
		compare::SweepLoad,
		report::{self, Report},
		BranchRecord,
		Config,
		PointFilter,
		ResultSet,
		Simulation,
		Sweep,
		TreeAggregate,
	},
	cachesweep_util::{logger, DisplayWrapper},
	clap::Parser,
	std::{error::Error as StdError, fmt, fs, io, path::Path},
};

fn main() -> Result<(), anyhow::Error> {
	// Get arguments
	let args = Args::parse();
	logger::pre_init::debug(format!("Args: {args:?}"));

	// Initialize logging
	logger::init(args.log_file.as_deref(), args.log_file_append);

	// Then check the sub-command
	match args.sub_cmd {
		SubCmd::Run(cmd) => self::run(&cmd),
		SubCmd::Report(cmd) => match cmd.branch {
			true => self::report_tree::<BranchRecord>(&cmd.input),
			false => self::report_tree::<ResultSet>(&cmd.input),
		},
		SubCmd::Compare(cmd) => self::compare(&cmd),
		SubCmd::Averages(cmd) => self::averages(&cmd),
	}
}

/// Runs a sweep, then checks every point's results
fn run(cmd: &args::Run) -> Result<(), anyhow::Error> {
	let config = Config::from_path(&cmd.config_file)?;
	let launcher = config.launcher().context("Unable to create launcher")?;

	tracing::info!(
		points = config.space.len(),
		benchmarks = config.benchmarks.len(),
		root = ?config.simulations_root,
		"Starting sweep"
	);
	let sweep_report = launcher.run(config.space.points()).context("Unable to run sweep")?;

	// Surface any incomplete results now, rather than when comparing
	let benchmarks = config.benchmark_names();
	let mut incomplete = 0;
	for point_report in &sweep_report.points {
		let load = Simulation::load(&point_report.dir, &benchmarks, launcher.output_extension())
			.with_context(|| format!("Unable to load results of {}", point_report.point))?;

		for err in &load.errors {
			tracing::warn!("{}", self::display_chain(err));
		}
		incomplete += load.errors.len();
	}

	let failed_workers = sweep_report.failures().count();
	match (failed_workers, incomplete) {
		(0, 0) => tracing::info!("Sweep finished"),
		_ => tracing::warn!("Sweep finished with {failed_workers} failed workers and {incomplete} incomplete results"),
	}

	Ok(())
}

/// Prints a report of all telemetry under `input`
fn report_tree<T: Telemetry + Report>(input: &Path) -> Result<(), anyhow::Error> {
	let aggregate = TreeAggregate::<T>::from_path(input).context("Unable to aggregate telemetry")?;
	for err in aggregate.errors() {
		tracing::warn!("{}", self::display_chain(err));
	}

	print!("{}", report::display_tree(&aggregate));
	Ok(())
}

/// Outputs a comparison along a free dimension
fn compare(cmd: &args::Compare) -> Result<(), anyhow::Error> {
	let sweep = self::load_sweep(&cmd.root)?;

	let pinned = PointFilter {
		log_num_rows:   cmd.log_num_rows,
		log_block_size: cmd.log_block_size,
		associativity:  cmd.associativity,
	};
	let selection = sweep
		.filter(pinned, cmd.free)
		.context("Unable to select simulations")?;
	if selection.simulations().is_empty() {
		tracing::warn!(?pinned, "No simulations matched");
	}
	let comparison = selection.comparison(cmd.model, cmd.kind);

	match &cmd.output_file {
		Some(output_path) => {
			let output_file = fs::File::create(output_path).context("Unable to create output file")?;
			serde_json::to_writer_pretty(output_file, &comparison).context("Unable to write to output file")?;
		},
		None => serde_json::to_writer_pretty(io::stdout().lock(), &comparison).context("Unable to write to stdout")?,
	}

	Ok(())
}

/// Prints each cache model's average miss rate at a point
fn averages(cmd: &args::Averages) -> Result<(), anyhow::Error> {
	let sweep = self::load_sweep(&cmd.root)?;
	let averages = sweep
		.model_averages(cmd.point, cmd.kind)
		.context("Unable to average miss rates")?;

	print!("{}", report::display_model_averages(cmd.point, &averages));
	Ok(())
}

/// Loads a sweep, warning about anything that didn't load
fn load_sweep(root: &Path) -> Result<Sweep, anyhow::Error> {
	let SweepLoad { sweep, errors } = Sweep::load(root).context("Unable to load sweep")?;
	for err in &errors {
		tracing::warn!("{}", self::display_chain(err));
	}

	Ok(sweep)
}

/// Displays an error along with all of its sources
fn display_chain(err: &dyn StdError) -> impl fmt::Display + '_ {
	DisplayWrapper::new(move |f: &mut fmt::Formatter<'_>| {
		write!(f, "{err}")?;
		let mut source = err.source();
		while let Some(err) = source {
			write!(f, ": {err}")?;
			source = err.source();
		}

		Ok(())
	})
}
