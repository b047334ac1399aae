//! Comparisons across sweep points

// Imports
use {
	crate::{
		aggregate::AccessKind,
		simulation::{Simulation, SimulationLoad},
		sweep_point::{Dimension, PointFilter},
		telemetry::CacheModel,
		Error,
		SweepPoint,
	},
	itertools::Itertools,
	std::{fs, path::Path},
};

/// Sweep results.
///
/// All simulations of a sweep.
#[derive(Clone, Default, Debug)]
pub struct Sweep {
	simulations: Vec<Simulation>,
}

impl Sweep {
	/// Creates a sweep from its simulations
	#[must_use]
	pub fn new(simulations: Vec<Simulation>) -> Self {
		Self { simulations }
	}

	/// Loads every simulation directory under `root`.
	///
	/// Directories that aren't sweep points and files that fail to load are
	/// reported in [`SweepLoad::errors`].
	///
	/// # Errors
	/// Returns an error if unable to read `root`.
	pub fn load(root: &Path) -> Result<SweepLoad, Error> {
		let mut dirs = fs::read_dir(root)
			.map_err(Error::io(root))?
			.map(|entry| entry.map(|entry| entry.path()).map_err(Error::io(root)))
			.collect::<Result<Vec<_>, _>>()?;
		dirs.retain(|path| path.is_dir());
		dirs.sort();

		let mut simulations = vec![];
		let mut errors = vec![];
		for dir in dirs {
			match Simulation::scan(&dir) {
				Ok(SimulationLoad {
					simulation,
					errors: sim_errors,
				}) => {
					simulations.push(simulation);
					errors.extend(sim_errors);
				},
				Err(err) => errors.push(err),
			}
		}
		tracing::debug!(
			simulations = simulations.len(),
			errors = errors.len(),
			"Loaded sweep"
		);

		Ok(SweepLoad {
			sweep: Self { simulations },
			errors,
		})
	}

	/// Returns all simulations
	#[must_use]
	pub fn simulations(&self) -> &[Simulation] {
		&self.simulations
	}

	/// Finds the simulation at `point`.
	///
	/// # Errors
	/// Returns an error if there isn't exactly one simulation at `point`.
	pub fn find(&self, point: SweepPoint) -> Result<&Simulation, Error> {
		let matches = self
			.simulations
			.iter()
			.filter(|simulation| simulation.point() == point)
			.collect::<Vec<_>>();

		match *matches.as_slice() {
			[simulation] => Ok(simulation),
			[] => Err(Error::ConfigurationNotFound { point }),
			_ => Err(Error::AmbiguousConfiguration {
				point,
				matches: matches.len(),
			}),
		}
	}

	/// Selects all simulations matching `pinned`, ordered by `free`.
	///
	/// # Errors
	/// Returns an error if `free` is pinned.
	pub fn filter(&self, pinned: PointFilter, free: Dimension) -> Result<Selection<'_>, Error> {
		if pinned.get(free).is_some() {
			return Err(Error::FreeDimensionPinned { dim: free });
		}

		let simulations = self
			.simulations
			.iter()
			.filter(|simulation| pinned.matches(&simulation.point()))
			.sorted_by_key(|simulation| simulation.point().get(free))
			.collect();

		Ok(Selection {
			pinned,
			free,
			simulations,
		})
	}

	/// Returns the mean miss rate of every cache model across all benchmarks at `point`
	///
	/// # Errors
	/// Returns an error if there isn't exactly one simulation at `point`.
	pub fn model_averages(&self, point: SweepPoint, kind: AccessKind) -> Result<Vec<(CacheModel, f64)>, Error> {
		let simulation = self.find(point)?;
		let averages = CacheModel::ALL
			.into_iter()
			.map(|model| (model, simulation.mean_miss_rate(model, kind)))
			.collect();

		Ok(averages)
	}
}

/// Output of [`Sweep::load`]
#[derive(Debug)]
pub struct SweepLoad {
	/// Sweep
	pub sweep: Sweep,

	/// Errors
	pub errors: Vec<Error>,
}

/// Selection of simulations along a free dimension
#[derive(Clone, Debug)]
pub struct Selection<'a> {
	/// Pinned dimensions
	pinned: PointFilter,

	/// Free dimension
	free: Dimension,

	/// Simulations, ordered by the free dimension
	simulations: Vec<&'a Simulation>,
}

impl<'a> Selection<'a> {
	/// Returns the free dimension
	#[must_use]
	pub const fn free(&self) -> Dimension {
		self.free
	}

	/// Returns all selected simulations
	#[must_use]
	pub fn simulations(&self) -> &[&'a Simulation] {
		&self.simulations
	}

	/// Returns the value of the free dimension of each simulation
	pub fn free_values(&self) -> impl Iterator<Item = u32> + '_ {
		let free = self.free;
		self.simulations
			.iter()
			.map(move |simulation| simulation.point().get(free))
	}

	/// Returns the benchmarks present in every selected simulation
	#[must_use]
	pub fn common_benchmarks(&self) -> Vec<&'a str> {
		let Some((&first, rest)) = self.simulations.split_first() else {
			return vec![];
		};

		first
			.benchmarks()
			.filter(|benchmark| rest.iter().all(|simulation| simulation.run(benchmark).is_some()))
			.collect()
	}

	/// Returns the miss rate series of `model` for each common benchmark
	#[must_use]
	pub fn series(&self, model: CacheModel, kind: AccessKind) -> Vec<Series<'_>> {
		self.common_benchmarks()
			.into_iter()
			.map(|benchmark| Series {
				benchmark,
				model,
				kind,
				free: self.free,
				simulations: &self.simulations,
			})
			.collect()
	}

	/// Returns the axis labels for plotting this selection
	#[must_use]
	pub fn labels(&self, model: CacheModel, kind: AccessKind) -> AxisLabels {
		let y = match kind {
			AccessKind::Read => "Read Miss Rate",
			AccessKind::Write => "Write Miss Rate",
			AccessKind::Total => "Miss Rate",
		};

		let pinned = self
			.pinned
			.pinned()
			.map(|(dim, value)| dim.describe(value))
			.join(", ");
		let title = match pinned.is_empty() {
			true => format!("{model} cache miss rate vs. {}", self.free.axis_label()),
			false => format!("{model} cache miss rate vs. {} ({pinned})", self.free.axis_label()),
		};

		AxisLabels {
			x: self.free.axis_label().to_owned(),
			y: y.to_owned(),
			title,
		}
	}

	/// Collects this selection into a comparison, for rendering
	#[must_use]
	pub fn comparison(&self, model: CacheModel, kind: AccessKind) -> Comparison {
		let series = self
			.series(model, kind)
			.iter()
			.map(|series| SeriesData {
				benchmark: series.benchmark().to_owned(),
				points:    series
					.points()
					.map(|(value, miss_rate)| SeriesPoint {
						value,
						axis_value: self.free.axis_value(value),
						miss_rate,
					})
					.collect(),
			})
			.collect();

		Comparison {
			labels: self.labels(model, kind),
			model,
			kind,
			free: self.free,
			series,
		}
	}
}

/// Miss rate series of a single benchmark
#[derive(Clone, Copy, Debug)]
pub struct Series<'a> {
	benchmark:   &'a str,
	model:       CacheModel,
	kind:        AccessKind,
	free:        Dimension,
	simulations: &'a [&'a Simulation],
}

impl<'a> Series<'a> {
	/// Returns the benchmark
	#[must_use]
	pub const fn benchmark(&self) -> &'a str {
		self.benchmark
	}

	/// Returns all `(free dimension value, miss rate)` points, in selection order.
	///
	/// The iterator is lazy and may be restarted by calling this again, or by cloning it.
	pub fn points(&self) -> impl Iterator<Item = (u32, f64)> + Clone + 'a {
		let Self {
			benchmark,
			model,
			kind,
			free,
			simulations,
		} = *self;

		simulations.iter().filter_map(move |simulation| {
			let results = simulation.run(benchmark)?;
			Some((simulation.point().get(free), results.get(model).miss_rate(kind)))
		})
	}
}

/// Axis labels
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct AxisLabels {
	pub x:     String,
	pub y:     String,
	pub title: String,
}

/// Comparison, ready for rendering
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Comparison {
	pub labels: AxisLabels,
	pub model:  CacheModel,
	pub kind:   AccessKind,
	pub free:   Dimension,
	pub series: Vec<SeriesData>,
}

/// Series of a [`Comparison`]
#[derive(Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SeriesData {
	pub benchmark: String,
	pub points:    Vec<SeriesPoint>,
}

/// Point of a [`SeriesData`]
#[derive(Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SeriesPoint {
	/// Value of the free dimension
	pub value: u32,

	/// Value to plot for the free dimension
	pub axis_value: f64,

	/// Miss rate
	pub miss_rate: f64,
}
