//! Tracing subscriber setup from the `logging` config section.

use lockstep_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the config file unless `--verbose` was given.
pub fn init(logging: Option<&LoggingConfig>, verbose: bool) {
    let directives = directives(logging, verbose);
    let filter = if verbose {
        EnvFilter::new(&directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives))
    };

    let json = logging.is_some_and(|l| l.format == "json");
    let stdout = logging.is_some_and(|l| l.output == "stdout");
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (json, stdout) {
        (true, true) => builder.json().with_writer(std::io::stdout).init(),
        (true, false) => builder.json().with_writer(std::io::stderr).init(),
        (false, true) => builder.with_writer(std::io::stdout).init(),
        (false, false) => builder.with_writer(std::io::stderr).init(),
    }
}

/// Filter directives: the base level followed by per-crate overrides.
fn directives(logging: Option<&LoggingConfig>, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else {
        logging.and_then(|l| l.level.as_deref()).unwrap_or("info")
    };

    let mut parts = vec![level.to_string()];
    if let Some(logging) = logging {
        parts.extend(logging.filters.iter().cloned());
    }
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: Option<&str>, filters: &[&str]) -> LoggingConfig {
        LoggingConfig {
            format: "plain".into(),
            level: level.map(String::from),
            filters: filters.iter().map(|f| f.to_string()).collect(),
            output: "stderr".into(),
        }
    }

    #[test]
    fn test_directives_default_to_info() {
        assert_eq!(directives(None, false), "info");
    }

    #[test]
    fn test_directives_from_config() {
        let cfg = logging(Some("warn"), &["lockstep_gateway=debug", "tower_http=info"]);
        assert_eq!(
            directives(Some(&cfg), false),
            "warn,lockstep_gateway=debug,tower_http=info"
        );
    }

    #[test]
    fn test_verbose_forces_debug() {
        let cfg = logging(Some("error"), &["lockstep_core=trace"]);
        assert_eq!(directives(Some(&cfg), true), "debug,lockstep_core=trace");
    }
}
