//! Tracing subscriber installation.
//!
//! ```bash
//! INJ_LOG=debug injc                      # flat events on stderr
//! INJ_LOG=inj_resolve=trace INJ_LOG_TREE=1 injc   # indented span tree
//! ```
//!
//! Nothing is installed unless `INJ_LOG` or `RUST_LOG` is set.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

static TRACING_INIT: Once = Once::new();

pub const LOG_VAR: &str = "INJ_LOG";
pub const LOG_TREE_VAR: &str = "INJ_LOG_TREE";

/// `INJ_LOG` first, then `RUST_LOG`.
fn filter_directives() -> Option<String> {
    std::env::var(LOG_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
}

/// Install the global subscriber once per process.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let Some(directives) = filter_directives() else {
            return;
        };
        let filter = EnvFilter::builder().parse_lossy(directives);

        // Another subscriber may already be installed by an embedding host.
        if std::env::var_os(LOG_TREE_VAR).is_some() {
            let tree = tracing_tree::HierarchicalLayer::default()
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_targets(true);
            let _ = Registry::default().with(filter).with(tree).try_init();
        } else {
            let flat = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(std::io::stderr);
            let _ = Registry::default().with(filter).with(flat).try_init();
        }
    });
}
