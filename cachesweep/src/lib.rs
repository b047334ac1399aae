//! Cache parameter sweep harness (`cachesweep`)
//!
//! Sweeps a cache simulator over a space of row counts, block sizes and
//! associativities, and compares the resulting miss rates of each cache
//! addressing model.

// Modules
pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod report;
pub mod simulation;
pub mod sweep;
pub mod sweep_point;
pub mod telemetry;

// Exports
pub use self::{
	aggregate::{AccessKind, TreeAggregate},
	compare::Sweep,
	config::Config,
	error::Error,
	simulation::Simulation,
	sweep::Launcher,
	sweep_point::{Dimension, PointFilter, SweepPoint, SweepSpace},
	telemetry::{BranchRecord, CacheModel, ResultSet, RunRecord},
};
