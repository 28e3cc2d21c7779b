use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "fleet_ledger=info";

/// Installs the global tracing subscriber. `RUST_LOG` directives are kept and
/// the facade logs at `info` unless overridden.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
            filter = filter.add_directive(directive);
        }
        // Another subscriber may already be installed by the embedding app.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
