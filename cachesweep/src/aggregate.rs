//! Aggregation.
//!
//! Records are combined by summing each counter, so aggregation order never
//! matters. Rates are always derived from the summed counters.

// Imports
use {
	crate::{
		telemetry::{BranchRecord, CacheModel, ParseError, ResultSet, RunRecord},
		Error,
	},
	std::{
		collections::BTreeMap,
		ffi::OsStr,
		fs,
		iter::Sum,
		ops::{Add, AddAssign},
		path::{Path, PathBuf},
		str::FromStr,
	},
};

/// Extensions of telemetry files
pub const TELEMETRY_EXTENSIONS: [&str; 2] = ["out", "txt"];

/// Access kind, for derived statistics
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[derive(clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AccessKind {
	/// Reads only
	Read,

	/// Writes only
	Write,

	/// Reads and writes
	Total,
}

/// Returns `part / whole`, or `0` if `whole` is `0`
#[must_use]
pub fn ratio(part: u64, whole: u64) -> f64 {
	match whole {
		0 => 0.0,
		_ => part as f64 / whole as f64,
	}
}

impl RunRecord {
	/// Returns the number of accesses of `kind`
	#[must_use]
	pub const fn count(&self, kind: AccessKind) -> u64 {
		match kind {
			AccessKind::Read => self.read_count,
			AccessKind::Write => self.write_count,
			AccessKind::Total => self.read_count + self.write_count,
		}
	}

	/// Returns the number of hits of `kind`
	#[must_use]
	pub const fn hits(&self, kind: AccessKind) -> u64 {
		match kind {
			AccessKind::Read => self.read_hits,
			AccessKind::Write => self.write_hits,
			AccessKind::Total => self.read_hits + self.write_hits,
		}
	}

	/// Returns the number of misses of `kind`
	#[must_use]
	pub const fn misses(&self, kind: AccessKind) -> u64 {
		self.count(kind) - self.hits(kind)
	}

	/// Returns the miss rate of `kind`, in `0.0..=1.0`.
	///
	/// Returns `0` if there were no accesses of `kind`.
	#[must_use]
	pub fn miss_rate(&self, kind: AccessKind) -> f64 {
		self::ratio(self.misses(kind), self.count(kind))
	}

	/// Returns the hit rate of `kind`, in `0.0..=1.0`.
	///
	/// Returns `0` if there were no accesses of `kind`.
	#[must_use]
	pub fn hit_rate(&self, kind: AccessKind) -> f64 {
		self::ratio(self.hits(kind), self.count(kind))
	}
}

impl AddAssign for RunRecord {
	fn add_assign(&mut self, rhs: Self) {
		self.read_count += rhs.read_count;
		self.write_count += rhs.write_count;
		self.read_hits += rhs.read_hits;
		self.write_hits += rhs.write_hits;
	}
}

impl AddAssign for ResultSet {
	fn add_assign(&mut self, rhs: Self) {
		for (record, rhs) in self.records.iter_mut().zip(rhs.records) {
			*record += rhs;
		}
	}
}

impl AddAssign for BranchRecord {
	fn add_assign(&mut self, rhs: Self) {
		self.taken_correct += rhs.taken_correct;
		self.taken_incorrect += rhs.taken_incorrect;
		self.not_taken_correct += rhs.not_taken_correct;
		self.not_taken_incorrect += rhs.not_taken_incorrect;
	}
}

macro_rules! impl_add_sum {
	($($T:ty),* $(,)?) => {
		$(
			impl Add for $T {
				type Output = Self;

				fn add(mut self, rhs: Self) -> Self {
					self += rhs;
					self
				}
			}

			impl Sum for $T {
				fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
					iter.fold(Self::default(), Add::add)
				}
			}

			impl<'a> Sum<&'a $T> for $T {
				fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
					iter.copied().sum()
				}
			}
		)*
	};
}

impl_add_sum!(RunRecord, ResultSet, BranchRecord);

/// Telemetry that can be aggregated over a directory tree
pub trait Telemetry: FromStr<Err = ParseError> + AddAssign + Default + Copy {
	/// Returns the number of accesses counted by this telemetry
	fn access_count(&self) -> u64;
}

impl Telemetry for ResultSet {
	fn access_count(&self) -> u64 {
		// Note: All models observe the same accesses
		self.get(CacheModel::Pipt).count(AccessKind::Total)
	}
}

impl Telemetry for BranchRecord {
	fn access_count(&self) -> u64 {
		self.total()
	}
}

/// Extension trait for telemetry paths
#[extend::ext(name = TelemetryPath)]
pub impl Path {
	/// Returns if this path has a telemetry file extension
	fn is_telemetry_file(&self) -> bool {
		self.extension()
			.and_then(OsStr::to_str)
			.is_some_and(|ext| TELEMETRY_EXTENSIONS.contains(&ext))
	}

	/// Returns the short name of this telemetry file.
	///
	/// This is the file stem, up to the first `_`.
	fn short_name(&self) -> Option<&str> {
		self.file_stem()?.to_str()?.split('_').next()
	}
}

/// Reads and parses a telemetry file
pub fn read_telemetry<T: Telemetry>(path: &Path) -> Result<T, Error> {
	let contents = fs::read_to_string(path).map_err(Error::io(path))?;
	let telemetry = contents.parse::<T>().map_err(|source| Error::MalformedTelemetry {
		path: path.to_path_buf(),
		source,
	})?;
	tracing::trace!(?path, "Parsed telemetry");

	Ok(telemetry)
}

/// Telemetry of a single file
#[derive(Clone, Debug)]
pub struct FileTelemetry<T> {
	/// Path
	pub path: PathBuf,

	/// Short name
	pub short_name: String,

	/// Telemetry
	pub telemetry: T,
}

/// Aggregate of all telemetry files within a tree
#[derive(Debug)]
pub struct TreeAggregate<T> {
	/// All files, by path
	files: Vec<FileTelemetry<T>>,

	/// Total of all files
	total: T,

	/// Maximum access count of a single file
	max_access_count: u64,

	/// Errors for files that couldn't be parsed
	errors: Vec<Error>,
}

impl<T: Telemetry> TreeAggregate<T> {
	/// Creates an empty aggregate
	#[must_use]
	pub fn new() -> Self {
		Self {
			files:            vec![],
			total:            T::default(),
			max_access_count: 0,
			errors:           vec![],
		}
	}

	/// Aggregates all telemetry files under `path`.
	///
	/// If `path` is a file, only it is aggregated.
	/// Files are visited in path order. Files that fail to parse are recorded in
	/// [`Self::errors`] without stopping the aggregation.
	///
	/// # Errors
	/// Returns an error if unable to walk the tree.
	pub fn from_path(path: &Path) -> Result<Self, Error> {
		let paths = match path.is_dir() {
			true => {
				let mut paths = vec![];
				self::collect_telemetry_files(path, &mut paths)?;
				paths.sort();
				paths
			},
			false => vec![path.to_path_buf()],
		};

		let mut aggregate = Self::new();
		for path in paths {
			match self::read_telemetry::<T>(&path) {
				Ok(telemetry) => aggregate.push(path, telemetry),
				Err(err) => {
					tracing::warn!(?path, ?err, "Skipping telemetry file");
					aggregate.errors.push(err);
				},
			}
		}

		Ok(aggregate)
	}

	/// Adds a file's telemetry to this aggregate
	pub fn push(&mut self, path: PathBuf, telemetry: T) {
		self.total += telemetry;
		self.max_access_count = self.max_access_count.max(telemetry.access_count());

		let short_name = path.short_name().unwrap_or_default().to_owned();
		self.files.push(FileTelemetry {
			path,
			short_name,
			telemetry,
		});
	}

	/// Returns all files
	#[must_use]
	pub fn files(&self) -> &[FileTelemetry<T>] {
		&self.files
	}

	/// Returns the total of all files
	#[must_use]
	pub const fn total(&self) -> &T {
		&self.total
	}

	/// Returns the maximum access count of a single file
	#[must_use]
	pub const fn max_access_count(&self) -> u64 {
		self.max_access_count
	}

	/// Returns all errors
	#[must_use]
	pub fn errors(&self) -> &[Error] {
		&self.errors
	}

	/// Returns the total of each benchmark, by short name
	#[must_use]
	pub fn by_benchmark(&self) -> BTreeMap<&str, T> {
		let mut totals = BTreeMap::<_, T>::new();
		for file in &self.files {
			*totals.entry(file.short_name.as_str()).or_default() += file.telemetry;
		}

		totals
	}
}

impl<T: Telemetry> Default for TreeAggregate<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Collects all telemetry files under `dir`, recursively
fn collect_telemetry_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), Error> {
	for entry in fs::read_dir(dir).map_err(Error::io(dir))? {
		let entry = entry.map_err(Error::io(dir))?;
		let path = entry.path();
		let file_type = entry.file_type().map_err(Error::io(&path))?;

		match file_type.is_dir() {
			true => self::collect_telemetry_files(&path, paths)?,
			false if path.is_telemetry_file() => paths.push(path),
			false => tracing::trace!(?path, "Ignoring non-telemetry file"),
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use {super::*, proptest::prelude::*};

	fn record(read_count: u64, write_count: u64, read_hits: u64, write_hits: u64) -> RunRecord {
		RunRecord::new(read_count, write_count, read_hits, write_hits).expect("Invalid record")
	}

	#[test]
	fn miss_rates() {
		let record = record(100, 50, 90, 40);
		assert_eq!(record.miss_rate(AccessKind::Read), 0.1);
		assert_eq!(record.miss_rate(AccessKind::Write), 0.2);
		assert!((record.miss_rate(AccessKind::Total) - 20.0 / 150.0).abs() < 1e-12);
		assert!((record.miss_rate(AccessKind::Total) * 100.0 - 13.333).abs() < 1e-3);
		assert_eq!(record.hit_rate(AccessKind::Read), 0.9);
	}

	#[test]
	fn zero_count_rates() {
		let record = record(0, 10, 0, 5);
		assert_eq!(record.miss_rate(AccessKind::Read), 0.0);
		assert_eq!(record.hit_rate(AccessKind::Read), 0.0);
		assert_eq!(record.miss_rate(AccessKind::Write), 0.5);
		assert_eq!(RunRecord::default().miss_rate(AccessKind::Total), 0.0);
	}

	#[test]
	fn short_names() {
		assert_eq!(Path::new("a/blackscholes_4K.out").short_name(), Some("blackscholes"));
		assert_eq!(Path::new("fft.txt").short_name(), Some("fft"));
		assert!(Path::new("fft.txt").is_telemetry_file());
		assert!(!Path::new("fft.json").is_telemetry_file());
	}

	#[test]
	fn tree_aggregation() {
		let dir = tempfile::tempdir().expect("Unable to create temporary directory");
		let write = |path: &str, contents: String| {
			let path = dir.path().join(path);
			fs::create_dir_all(path.parent().expect("Path had no parent")).expect("Unable to create directory");
			fs::write(path, contents).expect("Unable to write file");
		};
		let results = |record: RunRecord| ResultSet::new(record, record, record).to_string();

		write("fft_1.out", results(record(10, 5, 5, 5)));
		write("nested/fft_2.out", results(record(20, 10, 10, 0)));
		write("nested/deeper/ferret.out", results(record(100, 0, 1, 0)));
		write("nested/broken.out", "physical index physical tag: 1,1,1,1\n".to_owned());
		write("nested/notes.md", "not telemetry".to_owned());

		let aggregate = TreeAggregate::<ResultSet>::from_path(dir.path()).expect("Unable to aggregate");
		assert_eq!(aggregate.files().len(), 3);
		assert_eq!(aggregate.errors().len(), 1);
		assert!(matches!(aggregate.errors()[0], Error::MalformedTelemetry { .. }));
		assert_eq!(aggregate.total().get(CacheModel::Vivt), &record(130, 15, 16, 5));
		assert_eq!(aggregate.max_access_count(), 100);

		let by_benchmark = aggregate.by_benchmark();
		assert_eq!(by_benchmark.keys().copied().collect::<Vec<_>>(), ["ferret", "fft"]);
		assert_eq!(by_benchmark["fft"].get(CacheModel::Pipt), &record(30, 15, 15, 5));
	}

	#[test]
	fn branch_tree_total() {
		let dir = tempfile::tempdir().expect("Unable to create temporary directory");
		fs::write(dir.path().join("a.out"), "1,2,3,4\n").expect("Unable to write file");
		fs::write(dir.path().join("b.out"), "takenCorrect: 10  takenIncorrect: 0 notTakenCorrect: 0 notTakenIncorrect: 10\n")
			.expect("Unable to write file");

		let aggregate = TreeAggregate::<BranchRecord>::from_path(dir.path()).expect("Unable to aggregate");
		assert_eq!(aggregate.total().total(), 30);
		assert_eq!(aggregate.total().correct(), 14);
		assert_eq!(aggregate.max_access_count(), 20);
	}

	fn run_record() -> impl Strategy<Value = RunRecord> {
		(0..1_u64 << 40, 0..1_u64 << 40)
			.prop_flat_map(|(read_count, write_count)| (Just(read_count), Just(write_count), 0..=read_count, 0..=write_count))
			.prop_map(|(read_count, write_count, read_hits, write_hits)| {
				record(read_count, write_count, read_hits, write_hits)
			})
	}

	fn result_set() -> impl Strategy<Value = ResultSet> {
		(run_record(), run_record(), run_record()).prop_map(|(pipt, vipt, vivt)| ResultSet::new(pipt, vipt, vivt))
	}

	proptest! {
		#[test]
		fn self_aggregation_doubles(record in run_record()) {
			let doubled = record + record;
			prop_assert_eq!(doubled.to_counts(), record.to_counts().map(|count| 2 * count));
		}

		#[test]
		fn aggregation_order_is_irrelevant(a in result_set(), b in result_set(), c in result_set()) {
			let all = [a, b, c].iter().sum::<ResultSet>();
			prop_assert_eq!((a + b) + c, all);
			prop_assert_eq!(a + (b + c), all);
			prop_assert_eq!(c + b + a, all);
			prop_assert_eq!(b + ResultSet::default() + c + a, all);
		}

		#[test]
		fn miss_rate_in_unit_range(record in run_record()) {
			for kind in [AccessKind::Read, AccessKind::Write, AccessKind::Total] {
				let rate = record.miss_rate(kind);
				prop_assert!((0.0..=1.0).contains(&rate));
				if record.count(kind) == 0 {
					prop_assert_eq!(rate, 0.0);
				}
			}
		}
	}
}
