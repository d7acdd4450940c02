use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

// Reload hook captured at init time; the handle type is an implementation
// detail of the subscriber builder, so it lives behind a boxed closure.
static DEBUG_SWITCH: OnceLock<Box<dyn Fn(bool) + Send + Sync>> = OnceLock::new();

/// Install the global fmt subscriber with a reloadable filter.
///
/// Honors `RUST_LOG`, defaults to INFO, and wires up the runtime debug
/// switch. Calling this more than once is harmless; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_filter_reloading();
    let handle = builder.reload_handle();

    if builder.try_init().is_err() {
        // A subscriber is already installed (common under `cargo test`)
        return;
    }

    let _ = DEBUG_SWITCH.set(Box::new(move |enabled| {
        let directives = if enabled { "debug" } else { "info" };
        if let Err(err) = handle.reload(EnvFilter::new(directives)) {
            tracing::warn!(error = %err, "Failed to reload log filter");
        }
    }));
}

/// Switch runtime verbosity between DEBUG and INFO.
///
/// The configuration store calls this when a loaded document carries the
/// `system.debug` flag. Before `init` has run this does nothing.
pub fn set_debug(enabled: bool) {
    if let Some(switch) = DEBUG_SWITCH.get() {
        switch(enabled);
    }
}
