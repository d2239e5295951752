use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter, e.g. `debug` or
/// `info,ascii_whisper::session=trace`.
pub const LOG_ENV: &str = "WHISPER_LOG";

static INIT: Once = Once::new();

/// Initialize logging with a filter taken from the `WHISPER_LOG` environment variable.
/// Defaults to `info` if the variable is not set or invalid. Output goes to stderr so
/// it does not interleave with the chat on stdout. Calling it again is a no-op.
pub fn init_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(fmt::time::uptime());
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .try_init();
    });
}
