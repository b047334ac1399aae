//! Sweep launcher.
//!
//! Runs every benchmark under the instrumentation tool at each sweep point.
//! Points are swept one after another, while the benchmarks of a point run in parallel,
//! each writing to its own output file.

// Imports
use {
	crate::{simulation, Error, SweepPoint},
	std::{
		collections::HashSet,
		ffi::OsString,
		fs,
		io,
		path::{Path, PathBuf},
		process::{Child, Command, ExitStatus},
		thread,
		time::{Duration, Instant},
	},
};

/// Benchmark.
///
/// A workload, run as an opaque command.
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BenchmarkSpec {
	/// Name, used for the output file
	pub name: String,

	/// Command line, starting with the executable
	pub command: Vec<String>,

	/// File to redirect into the benchmark's stdin
	#[serde(default)]
	pub stdin: Option<PathBuf>,
}

/// Instrumentation tool.
///
/// Invoked as `<program> <args>... -o <output> -r <log rows> -b <log block size> -a <associativity> -- <benchmark>...`
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Instrumentation {
	/// Program
	pub program: PathBuf,

	/// Arguments before the sweep point's
	#[serde(default)]
	pub args: Vec<String>,
}

impl Instrumentation {
	/// Returns the arguments to run `benchmark` at `point`, writing to `output`
	#[must_use]
	pub fn args(&self, point: SweepPoint, benchmark: &BenchmarkSpec, output: &Path) -> Vec<OsString> {
		let mut args = self.args.iter().map(OsString::from).collect::<Vec<_>>();
		args.extend([
			"-o".into(),
			output.as_os_str().to_owned(),
			"-r".into(),
			point.log_num_rows.to_string().into(),
			"-b".into(),
			point.log_block_size.to_string().into(),
			"-a".into(),
			point.associativity.to_string().into(),
			"--".into(),
		]);
		args.extend(benchmark.command.iter().map(OsString::from));

		args
	}
}

/// Sweep launcher
#[derive(Clone, Debug)]
pub struct Launcher {
	/// Root of all sweep point directories
	root: PathBuf,

	/// Instrumentation tool
	instrumentation: Instrumentation,

	/// Benchmarks
	benchmarks: Vec<BenchmarkSpec>,

	/// Output file extension
	output_extension: String,

	/// Worker timeout
	worker_timeout: Option<Duration>,
}

impl Launcher {
	/// Default output file extension
	pub const DEFAULT_OUTPUT_EXTENSION: &'static str = "txt";

	/// Interval between checks on a worker with a timeout
	const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

	/// Creates a new launcher
	#[must_use]
	pub fn new(root: impl Into<PathBuf>, instrumentation: Instrumentation, benchmarks: Vec<BenchmarkSpec>) -> Self {
		Self {
			root: root.into(),
			instrumentation,
			benchmarks,
			output_extension: Self::DEFAULT_OUTPUT_EXTENSION.to_owned(),
			worker_timeout: None,
		}
	}

	/// Sets the output file extension
	#[must_use]
	pub fn with_output_extension(mut self, output_extension: impl Into<String>) -> Self {
		self.output_extension = output_extension.into();
		self
	}

	/// Sets a timeout after which workers are killed
	#[must_use]
	pub const fn with_worker_timeout(mut self, worker_timeout: Option<Duration>) -> Self {
		self.worker_timeout = worker_timeout;
		self
	}

	/// Returns the root directory
	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Returns all benchmarks
	#[must_use]
	pub fn benchmarks(&self) -> &[BenchmarkSpec] {
		&self.benchmarks
	}

	/// Returns the output file extension
	#[must_use]
	pub fn output_extension(&self) -> &str {
		&self.output_extension
	}

	/// Returns the output directory of `point`
	#[must_use]
	pub fn point_dir(&self, point: SweepPoint) -> PathBuf {
		simulation::point_dir(&self.root, point)
	}

	/// Returns the output file of `benchmark` at `point`
	#[must_use]
	pub fn output_path(&self, point: SweepPoint, benchmark: &BenchmarkSpec) -> PathBuf {
		self.point_dir(point)
			.join(format!("{}.{}", benchmark.name, self.output_extension))
	}

	/// Runs all `points`, in order.
	///
	/// Every point is checked before anything is run, so nothing is spawned if any point
	/// was already swept.
	/// Failed workers don't stop the sweep. They're reported in the output.
	///
	/// # Errors
	/// Returns an error if a point appears twice or already has an output directory,
	/// or if unable to create an output directory.
	pub fn run(&self, points: impl IntoIterator<Item = SweepPoint>) -> Result<SweepReport, Error> {
		let points = points.into_iter().collect::<Vec<_>>();
		self.check_points(&points)?;

		fs::create_dir_all(&self.root).map_err(Error::io(&self.root))?;

		let mut reports = Vec::with_capacity(points.len());
		for (point_idx, &point) in points.iter().enumerate() {
			tracing::info!("[{}/{}] Running sweep point {point}", point_idx + 1, points.len());
			let report = self.run_point(point)?;

			for worker in report.failures() {
				tracing::warn!(%point, benchmark = worker.benchmark.as_str(), outcome = ?worker.outcome, "Worker failed");
			}
			reports.push(report);
		}

		Ok(SweepReport { points: reports })
	}

	/// Checks that no point repeats or was already swept
	fn check_points(&self, points: &[SweepPoint]) -> Result<(), Error> {
		let mut seen = HashSet::new();
		for &point in points {
			let path = self.point_dir(point);
			if !seen.insert(point) || path.exists() {
				return Err(Error::DuplicateSweepPoint { point, path });
			}
		}

		Ok(())
	}

	/// Runs all benchmarks at `point` and waits for all of them.
	///
	/// # Errors
	/// Returns an error if the point's output directory already exists, or if unable to create it.
	pub fn run_point(&self, point: SweepPoint) -> Result<PointReport, Error> {
		let dir = self.point_dir(point);
		fs::create_dir(&dir).map_err(|source| match source.kind() {
			io::ErrorKind::AlreadyExists => Error::DuplicateSweepPoint {
				point,
				path: dir.clone(),
			},
			_ => Error::Io {
				path: dir.clone(),
				source,
			},
		})?;

		let workers = thread::scope(|scope| {
			let handles = self
				.benchmarks
				.iter()
				.map(|benchmark| (benchmark, scope.spawn(move || self.run_worker(point, benchmark))))
				.collect::<Vec<_>>();

			handles
				.into_iter()
				.map(|(benchmark, handle)| WorkerReport {
					benchmark: benchmark.name.clone(),
					output:    self.output_path(point, benchmark),
					outcome:   handle.join().unwrap_or(WorkerOutcome::Panicked),
				})
				.collect()
		});

		Ok(PointReport { point, dir, workers })
	}

	/// Runs a single worker to completion
	fn run_worker(&self, point: SweepPoint, benchmark: &BenchmarkSpec) -> WorkerOutcome {
		let output = self.output_path(point, benchmark);
		let args = self.instrumentation.args(point, benchmark, &output);
		tracing::debug!(%point, benchmark = benchmark.name.as_str(), ?args, "Spawning worker");

		let mut command = Command::new(&self.instrumentation.program);
		command.args(&args);
		if let Some(stdin) = &benchmark.stdin {
			match fs::File::open(stdin) {
				Ok(file) => {
					command.stdin(file);
				},
				Err(err) => return WorkerOutcome::SpawnFailed(err),
			}
		}

		let mut child = match command.spawn() {
			Ok(child) => child,
			Err(err) => return WorkerOutcome::SpawnFailed(err),
		};

		let status = match self.worker_timeout {
			Some(timeout) => self::wait_timeout(&mut child, timeout),
			None => child.wait().map(Some),
		};

		match status {
			Ok(Some(status)) => WorkerOutcome::Exited(status),
			Ok(None) => WorkerOutcome::TimedOut,
			Err(err) => WorkerOutcome::WaitFailed(err),
		}
	}
}

/// Waits for `child`, killing it after `timeout`.
///
/// Returns `None` if it was killed.
fn wait_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>, io::Error> {
	let start_time = Instant::now();
	loop {
		if let Some(status) = child.try_wait()? {
			return Ok(Some(status));
		}

		let elapsed = start_time.elapsed();
		if elapsed >= timeout {
			if let Err(err) = child.kill() {
				tracing::warn!(?err, "Unable to kill timed out worker");
			}
			child.wait()?;
			return Ok(None);
		}

		thread::sleep(Launcher::WAIT_POLL_INTERVAL.min(timeout - elapsed));
	}
}

/// Worker outcome
#[derive(Debug)]
pub enum WorkerOutcome {
	/// Exited
	Exited(ExitStatus),

	/// Unable to spawn
	SpawnFailed(io::Error),

	/// Unable to wait
	WaitFailed(io::Error),

	/// Killed after timing out
	TimedOut,

	/// Worker thread panicked
	Panicked,
}

impl WorkerOutcome {
	/// Returns if the worker exited successfully
	#[must_use]
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Exited(status) if status.success())
	}
}

/// Report of a single worker
#[derive(Debug)]
pub struct WorkerReport {
	/// Benchmark name
	pub benchmark: String,

	/// Output file
	pub output: PathBuf,

	/// Outcome
	pub outcome: WorkerOutcome,
}

/// Report of a single sweep point
#[derive(Debug)]
pub struct PointReport {
	/// Sweep point
	pub point: SweepPoint,

	/// Output directory
	pub dir: PathBuf,

	/// Workers, in benchmark order
	pub workers: Vec<WorkerReport>,
}

impl PointReport {
	/// Returns all failed workers
	pub fn failures(&self) -> impl Iterator<Item = &WorkerReport> {
		self.workers.iter().filter(|worker| !worker.outcome.is_success())
	}
}

/// Report of a sweep
#[derive(Debug)]
pub struct SweepReport {
	/// All points, in sweep order
	pub points: Vec<PointReport>,
}

impl SweepReport {
	/// Returns all failed workers, with their point
	pub fn failures(&self) -> impl Iterator<Item = (SweepPoint, &WorkerReport)> {
		self.points
			.iter()
			.flat_map(|point| point.failures().map(move |worker| (point.point, worker)))
	}
}

#[cfg(all(test, unix))]
mod tests {
	use {
		super::*,
		crate::{aggregate::AccessKind, simulation::Simulation, telemetry::CacheModel},
	};

	/// Stand-in instrumentation tool.
	///
	/// Writes telemetry derived from the sweep point to the output file, then runs the benchmark.
	fn instrumentation() -> Instrumentation {
		let script = r#"
			out="$2"; rows="$4"; block="$6"; assoc="$8"
			shift 9
			for label in "physical index physical tag" "virtual index physical tag" "virtual index virtual tag"; do
				echo "$label: 100,$rows,$block,$assoc" >> "$out"
			done
			exec "$@"
		"#;

		Instrumentation {
			program: "sh".into(),
			args:    vec!["-c".to_owned(), script.to_owned(), "sh".to_owned()],
		}
	}

	fn benchmark(name: &str, command: &[&str]) -> BenchmarkSpec {
		BenchmarkSpec {
			name:    name.to_owned(),
			command: command.iter().map(|arg| arg.to_string()).collect(),
			stdin:   None,
		}
	}

	#[test]
	fn args_order() {
		let instrumentation = Instrumentation {
			program: "pin".into(),
			args:    vec!["-t".to_owned(), "caches.so".to_owned()],
		};
		let args = instrumentation.args(
			SweepPoint::new(10, 5, 2),
			&self::benchmark("fft", &["fft", "-m16", "-p1"]),
			Path::new("sims/10_5_2/fft.txt"),
		);

		assert_eq!(args, [
			"-t",
			"caches.so",
			"-o",
			"sims/10_5_2/fft.txt",
			"-r",
			"10",
			"-b",
			"5",
			"-a",
			"2",
			"--",
			"fft",
			"-m16",
			"-p1"
		]);
	}

	#[test]
	fn run_sweep() {
		let root = tempfile::tempdir().expect("Unable to create temporary directory");
		let launcher = Launcher::new(root.path().join("sims"), self::instrumentation(), vec![
			self::benchmark("good", &["true"]),
			self::benchmark("bad", &["false"]),
		]);

		let points = [SweepPoint::new(9, 2, 1), SweepPoint::new(9, 3, 2)];
		let report = launcher.run(points).expect("Unable to run sweep");
		assert_eq!(report.points.len(), 2);

		// Failing workers don't stop their siblings, nor the following points
		let failures = report.failures().collect::<Vec<_>>();
		assert_eq!(failures.len(), 2);
		assert!(failures.iter().all(|(_, worker)| worker.benchmark == "bad"));

		for point in points {
			let simulation = Simulation::load(&launcher.point_dir(point), &["good", "bad"], "txt")
				.expect("Unable to load simulation")
				.into_complete()
				.expect("Simulation was incomplete");

			let record = simulation.run("good").expect("Missing run").get(CacheModel::Vivt);
			assert_eq!(record.count(AccessKind::Write), u64::from(point.log_num_rows));
			assert_eq!(record.hits(AccessKind::Read), u64::from(point.log_block_size));
		}
	}

	#[test]
	fn existing_point_is_duplicate() {
		let root = tempfile::tempdir().expect("Unable to create temporary directory");
		let marker = root.path().join("marker");
		let launcher = Launcher::new(root.path(), self::instrumentation(), vec![self::benchmark("touch", &[
			"touch",
			marker.to_str().expect("Non-utf8 path"),
		])]);

		let existing = SweepPoint::new(10, 5, 2);
		fs::create_dir(launcher.point_dir(existing)).expect("Unable to create directory");

		let err = launcher
			.run([SweepPoint::new(9, 2, 1), existing])
			.expect_err("Ran over an existing point");
		assert!(matches!(err, Error::DuplicateSweepPoint { point, .. } if point == existing));

		// Nothing was spawned, not even for the first point
		assert!(!marker.exists());
		assert!(!launcher.point_dir(SweepPoint::new(9, 2, 1)).exists());
	}

	#[test]
	fn repeated_point_is_duplicate() {
		let root = tempfile::tempdir().expect("Unable to create temporary directory");
		let launcher = Launcher::new(root.path(), self::instrumentation(), vec![]);

		let point = SweepPoint::new(9, 2, 1);
		assert!(matches!(
			launcher.run([point, point]),
			Err(Error::DuplicateSweepPoint { .. })
		));
	}

	#[test]
	fn missing_output_is_incomplete() {
		let root = tempfile::tempdir().expect("Unable to create temporary directory");
		let launcher = Launcher::new(
			root.path(),
			Instrumentation {
				program: "does-not-exist-cachesweep-tool".into(),
				args:    vec![],
			},
			vec![self::benchmark("fft", &["true"])],
		);

		let point = SweepPoint::new(9, 2, 1);
		let report = launcher.run([point]).expect("Unable to run sweep");
		assert!(matches!(
			report.points[0].workers[0].outcome,
			WorkerOutcome::SpawnFailed(_)
		));

		let load = Simulation::load(&launcher.point_dir(point), &["fft"], launcher.output_extension())
			.expect("Unable to load simulation");
		assert!(matches!(&load.errors[..], [Error::IncompleteResult { .. }]));
	}

	#[test]
	fn worker_timeout() {
		let root = tempfile::tempdir().expect("Unable to create temporary directory");
		let launcher = Launcher::new(root.path(), self::instrumentation(), vec![self::benchmark("slow", &[
			"sleep", "10",
		])])
		.with_worker_timeout(Some(Duration::from_millis(200)));

		let report = launcher.run([SweepPoint::new(9, 2, 1)]).expect("Unable to run sweep");
		assert!(matches!(report.points[0].workers[0].outcome, WorkerOutcome::TimedOut));
	}
}
