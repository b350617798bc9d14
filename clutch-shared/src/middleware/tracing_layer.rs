use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `CLUTCH_LOG_FORMAT` (`json` | `pretty`) wins, otherwise
    /// `CLUTCH_ENV=production` means JSON.
    pub fn resolve(log_format: Option<&str>, env: Option<&str>) -> Self {
        match log_format.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            _ if env == Some("production") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    fn from_env() -> Self {
        let log_format = std::env::var("CLUTCH_LOG_FORMAT").ok();
        let env = std::env::var("CLUTCH_ENV").ok();
        Self::resolve(log_format.as_deref(), env.as_deref())
    }
}

/// Filter used when `RUST_LOG` is unset: the service's own crate at debug.
pub fn default_filter(service_name: &str) -> String {
    let crate_target = service_name.replace('-', "_");
    format!("info,{crate_target}=debug,tower_http=debug")
}

/// Install the global subscriber for a Clutch binary.
pub fn init_tracing(service_name: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name)));
    let format = LogFormat::from_env();

    match format {
        LogFormat::Json => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(json_layer)
                .init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
    }

    tracing::info!(service = service_name, ?format, "tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults_to_json() {
        assert_eq!(LogFormat::resolve(None, Some("production")), LogFormat::Json);
        assert_eq!(LogFormat::resolve(None, Some("staging")), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve(None, None), LogFormat::Pretty);
    }

    #[test]
    fn explicit_format_overrides_env() {
        assert_eq!(LogFormat::resolve(Some("pretty"), Some("production")), LogFormat::Pretty);
        assert_eq!(LogFormat::resolve(Some("JSON"), None), LogFormat::Json);
        assert_eq!(LogFormat::resolve(Some("xml"), Some("production")), LogFormat::Json);
    }

    #[test]
    fn filter_uses_crate_target() {
        assert_eq!(default_filter("clutch-api"), "info,clutch_api=debug,tower_http=debug");
    }
}
