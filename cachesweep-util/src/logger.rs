//! Logger

// Imports
use {
	std::{
		fs,
		io,
		mem,
		path::Path,
		sync::{Mutex, PoisonError},
	},
	tracing::metadata::LevelFilter,
	tracing_subscriber::{prelude::*, EnvFilter},
};

/// Messages logged before the logger was initialized
static PRE_INIT_MSGS: Mutex<Vec<(pre_init::Level, String)>> = Mutex::new(Vec::new());

/// Logging before the logger is initialized.
///
/// Messages are buffered and emitted once [`init`] is called.
pub mod pre_init {
	// Imports
	use {super::PRE_INIT_MSGS, std::sync::PoisonError};

	/// Level of a buffered message
	#[derive(PartialEq, Eq, Clone, Copy, Debug)]
	pub(super) enum Level {
		Trace,
		Debug,
		Info,
		Warn,
		Error,
	}

	macro_rules! pre_init_fns {
		($($name:ident => $level:ident),* $(,)?) => {
			$(
				#[doc = concat!("Buffers a `", stringify!($name), "` message until the logger is initialized")]
				pub fn $name(msg: impl Into<String>) {
					PRE_INIT_MSGS
						.lock()
						.unwrap_or_else(PoisonError::into_inner)
						.push((Level::$level, msg.into()));
				}
			)*
		};
	}

	pre_init_fns! {
		trace => Trace,
		debug => Debug,
		info => Info,
		warn => Warn,
		error => Error,
	}
}

/// Initializes the logger.
///
/// Logs to stderr, filtered by `RUST_LOG` (`info` by default).
/// If `log_file` is given, also logs to it, filtered by `RUST_LOG_FILE` (`debug` by default).
pub fn init(log_file: Option<&Path>, log_file_append: bool) {
	let term_layer = tracing_subscriber::fmt::layer()
		.with_writer(io::stderr)
		.with_filter(self::env_filter("RUST_LOG", LevelFilter::INFO));

	let file_layer = log_file.and_then(|log_file| {
		let file = fs::OpenOptions::new()
			.create(true)
			.write(true)
			.append(log_file_append)
			.truncate(!log_file_append)
			.open(log_file);

		match file {
			Ok(file) => Some(
				tracing_subscriber::fmt::layer()
					.with_writer(Mutex::new(file))
					.with_ansi(false)
					.with_filter(self::env_filter("RUST_LOG_FILE", LevelFilter::DEBUG)),
			),
			Err(err) => {
				eprintln!("Unable to open log file {log_file:?}: {err}");
				None
			},
		}
	});

	if let Err(err) = tracing_subscriber::registry()
		.with(term_layer)
		.with(file_layer)
		.try_init()
	{
		eprintln!("Unable to initialize logger: {err}");
		return;
	}

	// Then emit everything logged before we were initialized
	let msgs = mem::take(&mut *PRE_INIT_MSGS.lock().unwrap_or_else(PoisonError::into_inner));
	for (level, msg) in msgs {
		match level {
			pre_init::Level::Trace => tracing::trace!("{msg}"),
			pre_init::Level::Debug => tracing::debug!("{msg}"),
			pre_init::Level::Info => tracing::info!("{msg}"),
			pre_init::Level::Warn => tracing::warn!("{msg}"),
			pre_init::Level::Error => tracing::error!("{msg}"),
		}
	}
}

/// Creates an env filter from `env`, defaulting to `default`
fn env_filter(env: &str, default: LevelFilter) -> EnvFilter {
	EnvFilter::builder()
		.with_default_directive(default.into())
		.with_env_var(env)
		.from_env_lossy()
}
