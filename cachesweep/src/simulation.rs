//! Simulations

// Imports
use {
	crate::{
		aggregate::{self, AccessKind, TelemetryPath},
		telemetry::{CacheModel, ResultSet},
		Error,
		SweepPoint,
	},
	average::Mean,
	std::{
		collections::BTreeMap,
		fs,
		io,
		path::{Path, PathBuf},
	},
};

/// Simulation.
///
/// The results of every benchmark at a single sweep point.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Simulation {
	/// Sweep point
	point: SweepPoint,

	/// Results, by benchmark name
	runs: BTreeMap<String, ResultSet>,
}

impl Simulation {
	/// Creates a new simulation
	#[must_use]
	pub fn new(point: SweepPoint, runs: BTreeMap<String, ResultSet>) -> Self {
		Self { point, runs }
	}

	/// Loads the simulation in `dir`, expecting a `<benchmark>.<extension>` file for each of `benchmarks`.
	///
	/// Missing and malformed files are reported per-benchmark in [`SimulationLoad::errors`],
	/// while all other benchmarks are still loaded.
	///
	/// # Errors
	/// Returns an error if `dir` isn't named after a sweep point.
	pub fn load<S: AsRef<str>>(dir: &Path, benchmarks: &[S], extension: &str) -> Result<SimulationLoad, Error> {
		let point = self::dir_point(dir)?;

		let mut runs = BTreeMap::new();
		let mut errors = vec![];
		for benchmark in benchmarks {
			let benchmark = benchmark.as_ref();
			let path = dir.join(format!("{benchmark}.{extension}"));
			match aggregate::read_telemetry::<ResultSet>(&path) {
				Ok(results) => {
					runs.insert(benchmark.to_owned(), results);
				},
				Err(Error::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
					errors.push(Error::IncompleteResult {
						point,
						benchmark: benchmark.to_owned(),
						path,
					});
				},
				Err(err) => errors.push(err),
			}
		}

		Ok(SimulationLoad {
			simulation: Self { point, runs },
			errors,
		})
	}

	/// Loads the simulation in `dir`, using every telemetry file within it as a benchmark.
	///
	/// The benchmark name of each file is its file stem.
	///
	/// # Errors
	/// Returns an error if `dir` isn't named after a sweep point, or if unable to read it.
	pub fn scan(dir: &Path) -> Result<SimulationLoad, Error> {
		let point = self::dir_point(dir)?;

		let mut paths = fs::read_dir(dir)
			.map_err(Error::io(dir))?
			.map(|entry| entry.map(|entry| entry.path()).map_err(Error::io(dir)))
			.collect::<Result<Vec<_>, _>>()?;
		paths.retain(|path| path.is_file() && path.is_telemetry_file());
		paths.sort();

		let mut runs = BTreeMap::new();
		let mut errors = vec![];
		for path in paths {
			let Some(benchmark) = path.file_stem().and_then(|stem| stem.to_str()) else {
				tracing::warn!(?path, "Ignoring telemetry file with non-utf8 name");
				continue;
			};

			match aggregate::read_telemetry::<ResultSet>(&path) {
				Ok(results) => {
					runs.insert(benchmark.to_owned(), results);
				},
				Err(err) => errors.push(err),
			}
		}

		Ok(SimulationLoad {
			simulation: Self { point, runs },
			errors,
		})
	}

	/// Returns the sweep point
	#[must_use]
	pub const fn point(&self) -> SweepPoint {
		self.point
	}

	/// Returns all runs, by benchmark
	#[must_use]
	pub const fn runs(&self) -> &BTreeMap<String, ResultSet> {
		&self.runs
	}

	/// Returns the run of `benchmark`
	#[must_use]
	pub fn run(&self, benchmark: &str) -> Option<&ResultSet> {
		self.runs.get(benchmark)
	}

	/// Returns all benchmark names
	pub fn benchmarks(&self) -> impl Iterator<Item = &str> {
		self.runs.keys().map(String::as_str)
	}

	/// Returns the mean miss rate of `model` across all benchmarks.
	///
	/// Returns `0` if there are no benchmarks.
	#[must_use]
	pub fn mean_miss_rate(&self, model: CacheModel, kind: AccessKind) -> f64 {
		let mean = self
			.runs
			.values()
			.map(|results| results.get(model).miss_rate(kind))
			.collect::<Mean>();

		match mean.is_empty() {
			true => 0.0,
			false => mean.mean(),
		}
	}
}

/// Output of [`Simulation::load`] and [`Simulation::scan`]
#[derive(Debug)]
pub struct SimulationLoad {
	/// Simulation, with every benchmark that loaded successfully
	pub simulation: Simulation,

	/// Errors of every benchmark that didn't
	pub errors: Vec<Error>,
}

impl SimulationLoad {
	/// Returns the simulation if every benchmark loaded, else the first error
	///
	/// # Errors
	/// Returns the first error, if any.
	pub fn into_complete(self) -> Result<Simulation, Error> {
		match self.errors.into_iter().next() {
			Some(err) => Err(err),
			None => Ok(self.simulation),
		}
	}
}

/// Returns the sweep point a directory is named after
fn dir_point(dir: &Path) -> Result<SweepPoint, Error> {
	let invalid = |source| Error::InvalidSweepDirectory {
		path: dir.to_path_buf(),
		source,
	};

	dir.file_name()
		.and_then(|name| name.to_str())
		.unwrap_or_default()
		.parse::<SweepPoint>()
		.map_err(invalid)
}

/// Returns the output directory of `point` under `root`
#[must_use]
pub fn point_dir(root: &Path, point: SweepPoint) -> PathBuf {
	root.join(point.dir_name())
}
