//! Utilities

// Modules
pub mod logger;

// Imports
use std::{cell::RefCell, fmt, num::ParseIntError};

/// Extension trait for `str` to parse a fixed number of counters
#[extend::ext(name = ParseCounts)]
pub impl str {
	/// Parses exactly `N` comma-separated unsigned counts from this string.
	///
	/// Whitespace around each count is ignored.
	fn parse_counts<const N: usize>(&self) -> Result<[u64; N], CountsError> {
		self::collect_counts(self.split(','))
	}

	/// Parses exactly `N` unsigned counts, separated by commas and/or whitespace.
	fn parse_loose_counts<const N: usize>(&self) -> Result<[u64; N], CountsError> {
		self::collect_counts(
			self.split(|ch: char| ch == ',' || ch.is_whitespace())
				.filter(|field| !field.is_empty()),
		)
	}
}

/// Collects exactly `N` counts from `fields`
fn collect_counts<'a, const N: usize>(mut fields: impl Iterator<Item = &'a str>) -> Result<[u64; N], CountsError> {
	let mut counts = [0; N];
	for (idx, count) in counts.iter_mut().enumerate() {
		let field = fields
			.next()
			.ok_or(CountsError::WrongLen { expected: N, found: idx })?
			.trim();
		*count = field.parse().map_err(|source| CountsError::Invalid {
			idx,
			field: field.to_owned(),
			source,
		})?;
	}

	let extra = fields.count();
	if extra != 0 {
		return Err(CountsError::WrongLen {
			expected: N,
			found:    N + extra,
		});
	}

	Ok(counts)
}

/// Error for [`ParseCounts`]
#[derive(Debug, thiserror::Error)]
pub enum CountsError {
	/// Wrong number of fields
	#[error("Expected {expected} counts, found {found}")]
	WrongLen { expected: usize, found: usize },

	/// A field wasn't an unsigned integer
	#[error("Count #{idx} ({field:?}) is not an unsigned integer")]
	Invalid {
		idx:    usize,
		field:  String,
		#[source]
		source: ParseIntError,
	},
}

/// [`fmt::Display`] helper to display using a `FnMut(&mut fmt::Formatter)`
pub struct DisplayWrapper<F: FnMut(&mut fmt::Formatter) -> fmt::Result>(RefCell<F>);

impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> DisplayWrapper<F> {
	/// Creates a new display wrapper
	#[must_use]
	pub const fn new(func: F) -> Self {
		Self(RefCell::new(func))
	}
}


impl<F: FnMut(&mut fmt::Formatter) -> fmt::Result> fmt::Display for DisplayWrapper<F> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		// Note: `f` cannot be re-entrant, so this cannot fail
		self.0.borrow_mut()(f)
	}
}
