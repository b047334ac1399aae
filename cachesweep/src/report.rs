//! Text reports

// Imports
use {
	crate::{
		aggregate::{AccessKind, Telemetry, TreeAggregate},
		telemetry::{BranchRecord, CacheModel, ResultSet},
		SweepPoint,
	},
	cachesweep_util::DisplayWrapper,
	std::fmt,
};

/// Telemetry that can be reported on
pub trait Report {
	/// Formats a report of this telemetry, titled `title`, to `f`
	fn fmt_report(&self, title: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Report for ResultSet {
	fn fmt_report(&self, title: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{title}:")?;
		for (model, record) in self.iter() {
			let stats = |kind: AccessKind, name: &str| {
				format!(
					"{name}={}/{} ({:.3}%)",
					record.hits(kind),
					record.count(kind),
					100.0 * record.miss_rate(kind)
				)
			};

			let name = format!("\t{}:", model.label());
			let read = stats(AccessKind::Read, "Read");
			let write = stats(AccessKind::Write, "Write");
			writeln!(
				f,
				"{name:<30}{read:<35}{write:<35}Total={:.3}%",
				100.0 * record.miss_rate(AccessKind::Total)
			)?;
		}

		Ok(())
	}
}

impl Report for BranchRecord {
	fn fmt_report(&self, title: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{title}:")?;
		writeln!(f, "\tTaken Correct = {}", self.taken_correct)?;
		writeln!(f, "\tTaken Incorrect = {}", self.taken_incorrect)?;
		writeln!(f, "\tNot Taken Correct = {}", self.not_taken_correct)?;
		writeln!(f, "\tNot Taken Incorrect = {}", self.not_taken_incorrect)?;
		writeln!(f)?;
		writeln!(
			f,
			"\tResults: {} / {} ({:.3}%)",
			self.correct(),
			self.total(),
			100.0 * self.correct_rate()
		)?;
		writeln!(f)
	}
}

/// Displays a report of `telemetry`
pub fn display<'a, T: Report>(title: &'a str, telemetry: &'a T) -> impl fmt::Display + 'a {
	DisplayWrapper::new(move |f: &mut fmt::Formatter<'_>| telemetry.fmt_report(title, f))
}

/// Displays a report of every file in `aggregate`, followed by the total
pub fn display_tree<T: Telemetry + Report>(aggregate: &TreeAggregate<T>) -> impl fmt::Display + '_ {
	DisplayWrapper::new(move |f: &mut fmt::Formatter<'_>| {
		for file in aggregate.files() {
			file.telemetry.fmt_report(&file.short_name, f)?;
		}

		aggregate.total().fmt_report("Total", f)?;
		writeln!(f, "Max # accesses: {}", aggregate.max_access_count())
	})
}

/// Displays the mean miss rate of each model at `point`
pub fn display_model_averages(point: SweepPoint, averages: &[(CacheModel, f64)]) -> impl fmt::Display + '_ {
	DisplayWrapper::new(move |f: &mut fmt::Formatter<'_>| {
		writeln!(f, "{point}:")?;
		for (model, average) in averages {
			writeln!(f, "\t{model}: {:.3}%", 100.0 * average)?;
		}

		Ok(())
	})
}

#[cfg(test)]
mod tests {
	use {super::*, crate::telemetry::RunRecord};

	#[test]
	fn result_set_report() {
		let record = RunRecord::new(100, 50, 90, 40).expect("Invalid record");
		let results = ResultSet::new(record, RunRecord::default(), record);
		let report = self::display("fft", &results).to_string();

		let lines = report.lines().collect::<Vec<_>>();
		assert_eq!(lines.len(), 4);
		assert_eq!(lines[0], "fft:");
		assert!(lines[1].starts_with("\tphysical index physical tag:"));
		assert!(lines[1].contains("Read=90/100 (10.000%)"));
		assert!(lines[1].contains("Write=40/50 (20.000%)"));
		assert!(lines[1].ends_with("Total=13.333%"));
		assert!(lines[2].contains("Read=0/0 (0.000%)"));
		assert!(lines[2].ends_with("Total=0.000%"));
	}

	#[test]
	fn branch_report() {
		let record = BranchRecord {
			taken_correct:       3,
			taken_incorrect:     1,
			not_taken_correct:   5,
			not_taken_incorrect: 1,
		};
		let report = self::display("bench", &record).to_string();
		assert!(report.contains("\tTaken Correct = 3\n"));
		assert!(report.contains("\tResults: 8 / 10 (80.000%)\n"));
	}

	#[test]
	fn tree_report() {
		let mut aggregate = TreeAggregate::<BranchRecord>::new();
		let record = BranchRecord {
			taken_correct:       1,
			taken_incorrect:     1,
			not_taken_correct:   1,
			not_taken_incorrect: 1,
		};
		aggregate.push("a_1.out".into(), record);
		aggregate.push("b_1.out".into(), record);

		let report = self::display_tree(&aggregate).to_string();
		assert!(report.starts_with("a:\n"));
		assert!(report.contains("\nb:\n"));
		assert!(report.contains("\nTotal:\n"));
		assert!(report.contains("\tResults: 4 / 8 (50.000%)"));
		assert!(report.ends_with("Max # accesses: 4\n"));
	}
}
