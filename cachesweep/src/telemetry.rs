//! Telemetry parsing.
//!
//! The instrumentation tool writes one line per cache model, of the form
//! `<label>: <read count>,<write count>,<read hits>,<write hits>`.

// Modules
pub mod branch;

// Exports
pub use self::branch::BranchRecord;

// Imports
use {
	cachesweep_util::{CountsError, ParseCounts},
	std::{fmt, str::FromStr},
};

/// Cache addressing model
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheModel {
	/// Physically indexed, physically tagged
	Pipt,

	/// Virtually indexed, physically tagged
	Vipt,

	/// Virtually indexed, virtually tagged
	Vivt,
}

impl CacheModel {
	/// All models, in the order they appear in a telemetry file
	pub const ALL: [Self; 3] = [Self::Pipt, Self::Vipt, Self::Vivt];

	/// Returns the label the instrumentation tool uses for this model
	#[must_use]
	pub const fn label(self) -> &'static str {
		match self {
			Self::Pipt => "physical index physical tag",
			Self::Vipt => "virtual index physical tag",
			Self::Vivt => "virtual index virtual tag",
		}
	}

	/// Returns the model with label `label`
	#[must_use]
	pub fn from_label(label: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|model| model.label() == label)
	}

	/// Returns the short code of this model
	#[must_use]
	pub const fn code(self) -> &'static str {
		match self {
			Self::Pipt => "PIPT",
			Self::Vipt => "VIPT",
			Self::Vivt => "VIVT",
		}
	}

	const fn idx(self) -> usize {
		match self {
			Self::Pipt => 0,
			Self::Vipt => 1,
			Self::Vivt => 2,
		}
	}
}

impl fmt::Display for CacheModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.pad(self.code())
	}
}

/// Run record.
///
/// Access and hit counts of a single cache model.
/// Hits never exceed their respective count.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RunRecord {
	pub(crate) read_count:  u64,
	pub(crate) write_count: u64,
	pub(crate) read_hits:   u64,
	pub(crate) write_hits:  u64,
}

impl RunRecord {
	/// Creates a new record.
	///
	/// Returns `None` if either hit count exceeds its access count.
	#[must_use]
	pub const fn new(read_count: u64, write_count: u64, read_hits: u64, write_hits: u64) -> Option<Self> {
		if read_hits > read_count || write_hits > write_count {
			return None;
		}

		Some(Self {
			read_count,
			write_count,
			read_hits,
			write_hits,
		})
	}

	/// Returns the number of reads
	#[must_use]
	pub const fn read_count(&self) -> u64 {
		self.read_count
	}

	/// Returns the number of writes
	#[must_use]
	pub const fn write_count(&self) -> u64 {
		self.write_count
	}

	/// Returns the number of read hits
	#[must_use]
	pub const fn read_hits(&self) -> u64 {
		self.read_hits
	}

	/// Returns the number of write hits
	#[must_use]
	pub const fn write_hits(&self) -> u64 {
		self.write_hits
	}

	/// Returns all counters, in file order
	#[must_use]
	pub const fn to_counts(&self) -> [u64; 4] {
		[self.read_count, self.write_count, self.read_hits, self.write_hits]
	}
}

impl FromStr for RunRecord {
	type Err = ParseErrorKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let [read_count, write_count, read_hits, write_hits] = s.parse_counts::<4>()?;
		Self::new(read_count, write_count, read_hits, write_hits).ok_or(ParseErrorKind::HitsExceedCount)
	}
}

impl fmt::Display for RunRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{},{},{},{}",
			self.read_count, self.write_count, self.read_hits, self.write_hits
		)
	}
}

/// Result set.
///
/// Records for every cache model, for one benchmark at one sweep point.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ResultSet {
	pub(crate) records: [RunRecord; 3],
}

impl ResultSet {
	/// Creates a result set from each model's record
	#[must_use]
	pub const fn new(pipt: RunRecord, vipt: RunRecord, vivt: RunRecord) -> Self {
		Self {
			records: [pipt, vipt, vivt],
		}
	}

	/// Returns the record of `model`
	#[must_use]
	pub const fn get(&self, model: CacheModel) -> &RunRecord {
		&self.records[model.idx()]
	}

	/// Returns all records, by model
	pub fn iter(&self) -> impl Iterator<Item = (CacheModel, &RunRecord)> {
		CacheModel::ALL.into_iter().zip(&self.records)
	}
}

impl FromStr for ResultSet {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut records = [None; 3];
		for (line_idx, line) in s.lines().enumerate() {
			let line_num = line_idx + 1;
			if line.trim().is_empty() {
				continue;
			}

			let (label, counts) = line
				.split_once(':')
				.ok_or(ParseError::at(line_num, ParseErrorKind::MissingSeparator))?;
			let model = CacheModel::from_label(label.trim())
				.ok_or_else(|| ParseError::at(line_num, ParseErrorKind::UnknownLabel(label.trim().to_owned())))?;
			let record = counts
				.parse::<RunRecord>()
				.map_err(|kind| ParseError::at(line_num, kind))?;

			if records[model.idx()].replace(record).is_some() {
				return Err(ParseError::at(line_num, ParseErrorKind::DuplicateModel(model)));
			}
		}

		let [pipt, vipt, vivt] = records;
		let get = |model: CacheModel, record: Option<RunRecord>| {
			record.ok_or(ParseError::whole(ParseErrorKind::MissingModel(model)))
		};
		Ok(Self::new(
			get(CacheModel::Pipt, pipt)?,
			get(CacheModel::Vipt, vipt)?,
			get(CacheModel::Vivt, vivt)?,
		))
	}
}

impl fmt::Display for ResultSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (model, record) in self.iter() {
			writeln!(f, "{}: {record}", model.label())?;
		}

		Ok(())
	}
}

/// Telemetry parse error
#[derive(Debug, thiserror::Error)]
pub struct ParseError {
	/// Line the error occurred on, if any
	pub line: Option<usize>,

	/// Error kind
	#[source]
	pub kind: ParseErrorKind,
}

impl ParseError {
	/// Creates an error on line `line`
	#[must_use]
	pub const fn at(line: usize, kind: ParseErrorKind) -> Self {
		Self { line: Some(line), kind }
	}

	/// Creates an error about the whole file
	#[must_use]
	pub const fn whole(kind: ParseErrorKind) -> Self {
		Self { line: None, kind }
	}
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.line {
			Some(line) => write!(f, "Line {line}: {}", self.kind),
			None => write!(f, "{}", self.kind),
		}
	}
}

/// Telemetry parse error kind
#[derive(Debug, thiserror::Error)]
pub enum ParseErrorKind {
	/// Line had no `:`
	#[error("Missing `:` separator")]
	MissingSeparator,

	/// Label didn't name a cache model
	#[error("Unknown label {0:?}")]
	UnknownLabel(String),

	/// Counters were invalid
	#[error("Invalid counts")]
	Counts(#[from] CountsError),

	/// A hit count exceeded its access count
	#[error("Hit count exceeds access count")]
	HitsExceedCount,

	/// A model appeared twice
	#[error("Duplicate record for {0}")]
	DuplicateModel(CacheModel),

	/// A model was missing
	#[error("Missing record for {0}")]
	MissingModel(CacheModel),

	/// Branch telemetry didn't have exactly one line
	#[error("Expected a single line, found {0}")]
	WrongLineCount(usize),

	/// Branch telemetry label didn't match
	#[error("Expected label {expected:?}, found {found:?}")]
	WrongLabel { expected: &'static str, found: String },
}

#[cfg(test)]
mod tests {
	use {super::*, proptest::prelude::*};

	const SAMPLE: &str = "physical index physical tag: 100,50,90,40\nvirtual index physical tag: 100,50,85,45\nvirtual \
	                      index virtual tag: 100,50,95,50\n";

	#[test]
	fn parse_sample() {
		let results = SAMPLE.parse::<ResultSet>().expect("Unable to parse sample");
		assert_eq!(results.get(CacheModel::Pipt), &RunRecord::new(100, 50, 90, 40).expect("Invalid record"));
		assert_eq!(results.get(CacheModel::Vipt), &RunRecord::new(100, 50, 85, 45).expect("Invalid record"));
		assert_eq!(results.get(CacheModel::Vivt), &RunRecord::new(100, 50, 95, 50).expect("Invalid record"));
		assert_eq!(results.to_string(), SAMPLE);
	}

	#[test]
	fn parse_any_order_with_whitespace() {
		let text = "virtual index virtual tag:  1, 1, 0, 1\n\nphysical index physical tag: 2,2,2,2\nvirtual index \
		            physical tag:3,3,3,3";
		let results = text.parse::<ResultSet>().expect("Unable to parse");
		assert_eq!(results.get(CacheModel::Vivt).to_counts(), [1, 1, 0, 1]);
		assert_eq!(results.get(CacheModel::Vipt).to_counts(), [3, 3, 3, 3]);
	}

	#[test]
	fn missing_model_is_malformed() {
		let text = "physical index physical tag: 100,50,90,40\nvirtual index physical tag: 100,50,85,45\n";
		let err = text.parse::<ResultSet>().expect_err("Parsed incomplete telemetry");
		assert!(matches!(err.kind, ParseErrorKind::MissingModel(CacheModel::Vivt)));
		assert_eq!(err.line, None);
	}

	#[test]
	fn malformed_lines() {
		let cases: [(&str, fn(&ParseErrorKind) -> bool); 5] = [
			("physical index physical tag 1,1,1,1", |kind| {
				matches!(kind, ParseErrorKind::MissingSeparator)
			}),
			("physical index tag: 1,1,1,1", |kind| {
				matches!(kind, ParseErrorKind::UnknownLabel(label) if label == "physical index tag")
			}),
			("physical index physical tag: 1,1,1", |kind| {
				matches!(
					kind,
					ParseErrorKind::Counts(CountsError::WrongLen { expected: 4, found: 3 })
				)
			}),
			("physical index physical tag: 1,1,2,1", |kind| {
				matches!(kind, ParseErrorKind::HitsExceedCount)
			}),
			("physical index physical tag: 1,-1,1,1", |kind| {
				matches!(kind, ParseErrorKind::Counts(CountsError::Invalid { idx: 1, .. }))
			}),
		];

		for (text, is_expected) in cases {
			let err = text.parse::<ResultSet>().expect_err("Parsed malformed telemetry");
			assert_eq!(err.line, Some(1), "{text:?}");
			assert!(is_expected(&err.kind), "{text:?}: {err:?}");
		}
	}

	#[test]
	fn duplicate_model() {
		let text = format!("{SAMPLE}physical index physical tag: 1,1,1,1\n");
		let err = text.parse::<ResultSet>().expect_err("Parsed duplicate model");
		assert!(matches!(err.kind, ParseErrorKind::DuplicateModel(CacheModel::Pipt)));
		assert_eq!(err.line, Some(4));
	}

	#[test]
	fn labels_are_explicit() {
		for model in CacheModel::ALL {
			assert_eq!(CacheModel::from_label(model.label()), Some(model));
		}
		assert_eq!(CacheModel::from_label("Physical Index Physical Tag"), None);
	}

	fn run_record() -> impl Strategy<Value = RunRecord> {
		(0..u64::MAX / 2, 0..u64::MAX / 2)
			.prop_flat_map(|(read_count, write_count)| (Just(read_count), Just(write_count), 0..=read_count, 0..=write_count))
			.prop_map(|(read_count, write_count, read_hits, write_hits)| {
				RunRecord::new(read_count, write_count, read_hits, write_hits).expect("Hits were within count")
			})
	}

	proptest! {
		#[test]
		fn record_line_round_trip(record in run_record()) {
			let line = format!("{}: {record}", CacheModel::Pipt.label());
			let (_, counts) = line.split_once(':').expect("Missing separator");
			prop_assert_eq!(counts.parse::<RunRecord>().ok(), Some(record));
		}
	}
}
