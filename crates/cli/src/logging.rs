//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directive for a `-v` count.
///
/// 0 keeps the library quiet apart from errors, 1 shows session
/// establishment, 2+ shows every probe and RPC call.
pub fn filter_for(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error,uia=error",
		1 => "warn,uia=info,uia_cli=info",
		_ => "debug",
	}
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the verbosity flag.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
