//! Branch prediction telemetry

// Imports
use {
	super::{ParseError, ParseErrorKind},
	cachesweep_util::ParseCounts,
	std::{fmt, str::FromStr},
};

/// Branch prediction record.
///
/// Running totals of a branch predictor's outcomes for one benchmark.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BranchRecord {
	pub taken_correct:       u64,
	pub taken_incorrect:     u64,
	pub not_taken_correct:   u64,
	pub not_taken_incorrect: u64,
}

impl BranchRecord {
	/// Labels of each counter, in file order
	pub const LABELS: [&'static str; 4] = ["takenCorrect", "takenIncorrect", "notTakenCorrect", "notTakenIncorrect"];

	/// Returns the total number of branches
	#[must_use]
	pub const fn total(&self) -> u64 {
		self.taken_correct + self.taken_incorrect + self.not_taken_correct + self.not_taken_incorrect
	}

	/// Returns the number of correctly predicted branches
	#[must_use]
	pub const fn correct(&self) -> u64 {
		self.taken_correct + self.not_taken_correct
	}

	/// Returns the fraction of correctly predicted branches.
	///
	/// Returns `0` if there were no branches.
	#[must_use]
	pub fn correct_rate(&self) -> f64 {
		crate::aggregate::ratio(self.correct(), self.total())
	}

	/// Parses the labeled form, `takenCorrect: a  takenIncorrect: b ...`
	fn parse_labeled(line: &str) -> Result<[u64; 4], ParseErrorKind> {
		let mut counts = [0; 4];
		let mut tokens = line.split_whitespace();
		for (count, expected) in counts.iter_mut().zip(Self::LABELS) {
			let label = tokens.next().unwrap_or_default();
			if label.strip_suffix(':') != Some(expected) {
				return Err(ParseErrorKind::WrongLabel {
					expected,
					found: label.to_owned(),
				});
			}

			let [value] = tokens.next().unwrap_or_default().parse_counts::<1>()?;
			*count = value;
		}

		if let Some(extra) = tokens.next() {
			return Err(ParseErrorKind::WrongLabel {
				expected: "end of line",
				found:    extra.to_owned(),
			});
		}

		Ok(counts)
	}
}

impl FromStr for BranchRecord {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let lines = s.lines().filter(|line| !line.trim().is_empty()).collect::<Vec<_>>();
		let &[line] = &lines[..] else {
			return Err(ParseError::whole(ParseErrorKind::WrongLineCount(lines.len())));
		};

		let counts = match line.trim_start().starts_with(Self::LABELS[0]) {
			true => Self::parse_labeled(line),
			false => line.parse_loose_counts::<4>().map_err(ParseErrorKind::from),
		};
		let [taken_correct, taken_incorrect, not_taken_correct, not_taken_incorrect] =
			counts.map_err(|kind| ParseError::at(1, kind))?;

		Ok(Self {
			taken_correct,
			taken_incorrect,
			not_taken_correct,
			not_taken_incorrect,
		})
	}
}

impl fmt::Display for BranchRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(
			f,
			"{},{},{},{}",
			self.taken_correct, self.taken_incorrect, self.not_taken_correct, self.not_taken_incorrect
		)
	}
}
