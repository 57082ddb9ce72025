use {
    crate::{Config, panic_hook},
    std::{io::IsTerminal, sync::Once},
    time::macros::format_description,
    tracing_subscriber::{EnvFilter, Layer, fmt::time::UtcTime, prelude::*},
};

/// Initializes the tracing setup shared between the binaries.
///
/// Every event is written to stderr. Stdout is left to the binary for its
/// actual output so it can be piped into other tools.
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    panic_hook::install();
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(config: &Config) {
    // The tracing subscriber below is a global object so initializing it again
    // in the same process would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| initialize(config));
}

fn set_tracing_subscriber(config: &Config) {
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let (plain, json) = if config.use_json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_filter(EnvFilter::new(&config.env_filter));
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_ansi(std::io::stderr().is_terminal())
            .with_filter(EnvFilter::new(&config.env_filter));
        (Some(layer), None)
    };

    tracing_subscriber::registry().with(plain).with(json).init();
    tracing::debug!(filter = %config.env_filter, json = config.use_json_format, "initialized tracing");
}
