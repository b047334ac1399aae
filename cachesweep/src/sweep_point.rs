//! Sweep points

// Imports
use {
	itertools::Itertools,
	std::{fmt, num::ParseIntError, ops::Range, str::FromStr},
};

/// Sweep point.
///
/// A single configuration of the simulated cache.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SweepPoint {
	/// Log2 of the number of rows
	pub log_num_rows: u32,

	/// Log2 of the block size, in bytes
	pub log_block_size: u32,

	/// Associativity
	pub associativity: u32,
}

impl SweepPoint {
	/// Separator between fields in the directory name
	pub const SEPARATOR: char = '_';

	/// Creates a new sweep point
	#[must_use]
	pub const fn new(log_num_rows: u32, log_block_size: u32, associativity: u32) -> Self {
		Self {
			log_num_rows,
			log_block_size,
			associativity,
		}
	}

	/// Returns the name of this point's output directory
	#[must_use]
	pub fn dir_name(&self) -> String {
		self.to_string()
	}

	/// Returns the value of dimension `dim`
	#[must_use]
	pub const fn get(&self, dim: Dimension) -> u32 {
		match dim {
			Dimension::LogNumRows => self.log_num_rows,
			Dimension::LogBlockSize => self.log_block_size,
			Dimension::Associativity => self.associativity,
		}
	}
}

impl fmt::Display for SweepPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sep = Self::SEPARATOR;
		write!(
			f,
			"{}{sep}{}{sep}{}",
			self.log_num_rows, self.log_block_size, self.associativity
		)
	}
}

impl FromStr for SweepPoint {
	type Err = SweepPointParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (log_num_rows, log_block_size, associativity) = s
			.split(Self::SEPARATOR)
			.collect_tuple()
			.ok_or(SweepPointParseError::WrongFieldCount)?;

		let parse = |dim: Dimension, value: &str| {
			value
				.parse::<u32>()
				.map_err(|source| SweepPointParseError::Field { dim, source })
		};

		Ok(Self {
			log_num_rows:   parse(Dimension::LogNumRows, log_num_rows)?,
			log_block_size: parse(Dimension::LogBlockSize, log_block_size)?,
			associativity:  parse(Dimension::Associativity, associativity)?,
		})
	}
}

/// Error for parsing a [`SweepPoint`]
#[derive(Debug, thiserror::Error)]
pub enum SweepPointParseError {
	/// Wrong number of fields
	#[error("Expected 3 fields separated by `{}`", SweepPoint::SEPARATOR)]
	WrongFieldCount,

	/// Field wasn't a number
	#[error("Invalid {dim}")]
	Field {
		dim:    Dimension,
		#[source]
		source: ParseIntError,
	},
}

/// Sweep dimension
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
	/// Log2 of the number of rows
	LogNumRows,

	/// Log2 of the block size
	LogBlockSize,

	/// Associativity
	Associativity,
}

impl Dimension {
	/// All dimensions, in enumeration order
	pub const ALL: [Self; 3] = [Self::LogNumRows, Self::LogBlockSize, Self::Associativity];

	/// Returns the axis label for this dimension
	#[must_use]
	pub const fn axis_label(self) -> &'static str {
		match self {
			Self::LogNumRows => "Number of Cache Rows",
			Self::LogBlockSize => "Cache Row Block Size (bytes)",
			Self::Associativity => "Cache Associativity",
		}
	}

	/// Returns the value to plot for `value` of this dimension.
	///
	/// Logarithmic dimensions are plotted as their actual size.
	#[must_use]
	pub fn axis_value(self, value: u32) -> f64 {
		match self {
			Self::LogNumRows | Self::LogBlockSize => 2.0_f64.powf(f64::from(value)),
			Self::Associativity => f64::from(value),
		}
	}

	/// Describes a pinned `value` of this dimension, for titles
	#[must_use]
	pub fn describe(self, value: u32) -> String {
		let axis_value = self.axis_value(value);
		match self {
			Self::LogNumRows => format!("Rows={axis_value}"),
			Self::LogBlockSize => format!("Block Size={axis_value} bytes"),
			Self::Associativity => format!("Associativity={axis_value}"),
		}
	}
}

impl fmt::Display for Dimension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::LogNumRows => "log number of rows",
			Self::LogBlockSize => "log block size",
			Self::Associativity => "associativity",
		};
		f.pad(name)
	}
}

/// Sweep space.
///
/// Half-open value ranges for each dimension.
#[derive(PartialEq, Eq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SweepSpace {
	pub log_num_rows:   Range<u32>,
	pub log_block_size: Range<u32>,
	pub associativity:  Range<u32>,
}

impl SweepSpace {
	/// Returns all points of this space.
	///
	/// Points are enumerated with the number of rows outermost, then the block size,
	/// with the associativity innermost.
	pub fn points(&self) -> impl Iterator<Item = SweepPoint> + '_ {
		itertools::iproduct!(
			self.log_num_rows.clone(),
			self.log_block_size.clone(),
			self.associativity.clone()
		)
		.map(|(log_num_rows, log_block_size, associativity)| {
			SweepPoint::new(log_num_rows, log_block_size, associativity)
		})
	}

	/// Returns the number of points in this space
	#[must_use]
	pub fn len(&self) -> usize {
		self.log_num_rows.len() * self.log_block_size.len() * self.associativity.len()
	}

	/// Returns if this space has no points
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Point filter.
///
/// A partial sweep point, with some dimensions pinned.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PointFilter {
	pub log_num_rows:   Option<u32>,
	pub log_block_size: Option<u32>,
	pub associativity:  Option<u32>,
}

impl PointFilter {
	/// Pins dimension `dim` to `value`
	#[must_use]
	pub fn pin(mut self, dim: Dimension, value: u32) -> Self {
		*self.get_mut(dim) = Some(value);
		self
	}

	/// Returns the pinned value of `dim`, if any
	#[must_use]
	pub const fn get(&self, dim: Dimension) -> Option<u32> {
		match dim {
			Dimension::LogNumRows => self.log_num_rows,
			Dimension::LogBlockSize => self.log_block_size,
			Dimension::Associativity => self.associativity,
		}
	}

	fn get_mut(&mut self, dim: Dimension) -> &mut Option<u32> {
		match dim {
			Dimension::LogNumRows => &mut self.log_num_rows,
			Dimension::LogBlockSize => &mut self.log_block_size,
			Dimension::Associativity => &mut self.associativity,
		}
	}

	/// Returns all pinned dimensions
	pub fn pinned(&self) -> impl Iterator<Item = (Dimension, u32)> + '_ {
		Dimension::ALL
			.into_iter()
			.filter_map(move |dim| self.get(dim).map(|value| (dim, value)))
	}

	/// Returns if `point` matches all pinned dimensions
	#[must_use]
	pub fn matches(&self, point: &SweepPoint) -> bool {
		self.pinned().all(|(dim, value)| point.get(dim) == value)
	}
}

impl From<SweepPoint> for PointFilter {
	fn from(point: SweepPoint) -> Self {
		Self {
			log_num_rows:   Some(point.log_num_rows),
			log_block_size: Some(point.log_block_size),
			associativity:  Some(point.associativity),
		}
	}
}
