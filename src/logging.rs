use tracing_subscriber::{fmt, EnvFilter};

/// Console logging, filtered by `RUST_LOG` (default `info,salesdw=info`).
/// `verbose` bumps this crate to debug when `RUST_LOG` is unset.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,salesdw=debug"
    } else {
        "info,salesdw=info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}
