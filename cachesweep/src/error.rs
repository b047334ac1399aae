//! Errors

// Imports
use {
	crate::{
		sweep_point::{Dimension, SweepPointParseError},
		telemetry::ParseError,
		SweepPoint,
	},
	std::{io, path::PathBuf},
};

/// Error
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Telemetry file didn't match the expected grammar
	#[error("Malformed telemetry file {path:?}")]
	MalformedTelemetry {
		path:   PathBuf,
		#[source]
		source: ParseError,
	},

	/// Expected telemetry file was missing
	#[error("Missing output {path:?} for benchmark {benchmark:?} at {point}")]
	IncompleteResult {
		point:     SweepPoint,
		benchmark: String,
		path:      PathBuf,
	},

	/// Sweep point was already swept, or appears twice
	#[error("Sweep point {point} already has an output directory at {path:?}")]
	DuplicateSweepPoint { point: SweepPoint, path: PathBuf },

	/// No simulation matched a sweep point
	#[error("No simulation found for {point}")]
	ConfigurationNotFound { point: SweepPoint },

	/// Multiple simulations matched a sweep point
	#[error("Found {matches} simulations for {point}")]
	AmbiguousConfiguration { point: SweepPoint, matches: usize },

	/// The free dimension of a comparison was pinned
	#[error("Free dimension {dim} must not be pinned")]
	FreeDimensionPinned { dim: Dimension },

	/// Directory name wasn't a sweep point
	#[error("Directory {path:?} is not a sweep point")]
	InvalidSweepDirectory {
		path:   PathBuf,
		#[source]
		source: SweepPointParseError,
	},

	/// I/O error on a path
	#[error("I/O error on {path:?}")]
	Io {
		path:   PathBuf,
		#[source]
		source: io::Error,
	},
}

impl Error {
	/// Creates an I/O error on `path`
	pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}
}
