use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default filter for a `-v` count when `RUST_LOG` is not set. Diagnostics
/// stay quiet at the default level; user-facing output goes through the
/// formatter instead.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "seqsort=info,warn",
        2 => "seqsort=debug,info",
        _ => "trace",
    }
}

/// Installs the stderr subscriber once per process. Later calls are no-ops,
/// and an already installed global subscriber is left in place.
pub fn init_logging(verbose: u8, quiet: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(console::Term::stderr().features().colors_supported())
                .with_filter(filter),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
