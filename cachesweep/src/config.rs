//! Configuration

// Imports
use {
	crate::{
		sweep::{BenchmarkSpec, Instrumentation, Launcher},
		sweep_point::SweepSpace,
	},
	anyhow::Context,
	std::{
		fs,
		io,
		path::{Path, PathBuf},
		time::Duration,
	},
};

/// Configuration
#[derive(PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
	/// Root of all sweep point directories
	pub simulations_root: PathBuf,

	/// Instrumentation tool
	pub instrumentation: Instrumentation,

	/// Output file extension
	#[serde(default = "default_output_extension")]
	pub output_extension: String,

	/// Sweep space
	pub space: SweepSpace,

	/// Benchmarks
	pub benchmarks: Vec<BenchmarkSpec>,

	/// Worker timeout (in seconds)
	#[serde(default)]
	pub worker_timeout_secs: Option<f64>,
}

impl Config {
	/// Reads a config from the file at `path`
	pub fn from_path(path: &Path) -> Result<Self, anyhow::Error> {
		let file = fs::File::open(path).with_context(|| format!("Unable to open config file {path:?}"))?;
		Self::from_reader(file).with_context(|| format!("Unable to read config file {path:?}"))
	}

	/// Parses a config from a reader
	pub fn from_reader(reader: impl io::Read) -> Result<Self, anyhow::Error> {
		serde_json::from_reader(reader).context("Unable to parse config")
	}

	/// Creates the launcher for this config
	pub fn launcher(&self) -> Result<Launcher, anyhow::Error> {
		let worker_timeout = self
			.worker_timeout_secs
			.map(Duration::try_from_secs_f64)
			.transpose()
			.context("Invalid worker timeout")?;

		Ok(
			Launcher::new(&self.simulations_root, self.instrumentation.clone(), self.benchmarks.clone())
				.with_output_extension(&self.output_extension)
				.with_worker_timeout(worker_timeout),
		)
	}

	/// Returns the names of all benchmarks
	#[must_use]
	pub fn benchmark_names(&self) -> Vec<&str> {
		self.benchmarks.iter().map(|benchmark| benchmark.name.as_str()).collect()
	}
}

fn default_output_extension() -> String {
	Launcher::DEFAULT_OUTPUT_EXTENSION.to_owned()
}

#[cfg(test)]
mod tests {
	use {super::*, crate::SweepPoint};

	#[test]
	fn bundled_config() {
		let config = Config::from_reader(include_str!("../resources/sweep.json").as_bytes())
			.expect("Unable to parse bundled config");

		assert_eq!(config.space.len(), 8 * 6 * 7);
		assert_eq!(config.benchmark_names(), [
			"blackscholes",
			"bodytrack",
			"cholesky",
			"ferret",
			"fft",
			"fluidanimate"
		]);
		assert!(config.benchmarks[2].stdin.is_some());

		let launcher = config.launcher().expect("Unable to create launcher");
		assert_eq!(
			launcher.output_path(SweepPoint::new(10, 5, 2), &config.benchmarks[4]),
			PathBuf::from("simulations/10_5_2/fft.txt")
		);
	}

	#[test]
	fn defaults() {
		let config = Config::from_reader(
			r#"{
				"simulations_root": "sims",
				"instrumentation": { "program": "pin" },
				"space": {
					"log_num_rows": { "start": 9, "end": 10 },
					"log_block_size": { "start": 2, "end": 3 },
					"associativity": { "start": 1, "end": 2 }
				},
				"benchmarks": [{ "name": "fft", "command": ["fft"] }]
			}"#
			.as_bytes(),
		)
		.expect("Unable to parse config");

		assert_eq!(config.output_extension, "txt");
		assert_eq!(config.worker_timeout_secs, None);
		assert!(config.instrumentation.args.is_empty());
		assert_eq!(config.space.points().collect::<Vec<_>>(), [SweepPoint::new(9, 2, 1)]);
	}

	#[test]
	fn invalid_timeout() {
		let mut config = Config::from_reader(include_str!("../resources/sweep.json").as_bytes())
			.expect("Unable to parse bundled config");
		config.worker_timeout_secs = Some(-1.0);
		assert!(config.launcher().is_err());
	}
}
