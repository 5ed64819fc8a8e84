//! Subscriber setup for the binaries.

use tracing_subscriber::EnvFilter;

/// Pick the filter: `RUST_LOG` wins, then `level`, then `"info"`.
///
/// `var_name` names the variable `level` came from; it only appears in the
/// warning printed when `level` does not parse.
pub fn env_filter(level: &str, var_name: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    match level.parse::<EnvFilter>() {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!(
                "WARN: {var_name}='{level}' is not a valid tracing filter ({e}); \
                 falling back to 'info'"
            );
            EnvFilter::new("info")
        }
    }
}

/// Install the global subscriber. `json` switches to newline-delimited JSON.
pub fn init_tracing(level: &str, json: bool, var_name: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level, var_name))
        .with_target(true)
        .with_thread_ids(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
