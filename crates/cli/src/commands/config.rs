use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use offerhub_core::config::AppConfig;
use offerhub_core::scoring::ScoringProfile;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// Where the effective configuration was read from, for source attribution.
struct Sources {
    file_path: Option<PathBuf>,
    file_doc: Option<Value>,
}

impl Sources {
    fn detect() -> Self {
        let file_path = ["offerhub.toml", "config/offerhub.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists());
        let file_doc = file_path.as_deref().and_then(load_file_doc);
        Self { file_path, file_doc }
    }

    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.file_doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .file_path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    CommandResult { exit_code: 0, output: render(&config, &Sources::detect()) }
}

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl ToString, env_keys: &'static [&'static str]) -> Field {
    Field { key, value: value.to_string(), env_keys }
}

fn render(config: &AppConfig, sources: &Sources) -> String {
    let distributors = config
        .distributors
        .iter()
        .map(|distributor| format!("{}={}", distributor.id, distributor.base_url))
        .collect::<Vec<_>>()
        .join(",");
    let weights = |profile: &ScoringProfile| {
        let weights = profile.weights;
        format!("price={} stock={} delivery={}", weights.price, weights.stock, weights.delivery)
    };

    let fields = [
        field("database.url", &config.database.url, &["OFFERHUB_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections,
            &["OFFERHUB_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs,
            &["OFFERHUB_DATABASE_TIMEOUT_SECS"],
        ),
        field("server.bind_address", &config.server.bind_address, &["OFFERHUB_SERVER_BIND_ADDRESS"]),
        field("server.port", config.server.port, &["OFFERHUB_SERVER_PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["OFFERHUB_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "gateway.request_timeout_secs",
            config.gateway.request_timeout_secs,
            &["OFFERHUB_GATEWAY_REQUEST_TIMEOUT_SECS"],
        ),
        field(
            "gateway.probe_timeout_secs",
            config.gateway.probe_timeout_secs,
            &["OFFERHUB_GATEWAY_PROBE_TIMEOUT_SECS"],
        ),
        field(
            "gateway.accept_invalid_certs",
            config.gateway.accept_invalid_certs,
            &["OFFERHUB_GATEWAY_ACCEPT_INVALID_CERTS"],
        ),
        field("distributors", distributors, &["OFFERHUB_DISTRIBUTORS"]),
        field("pricing.markup_pct", config.pricing.markup_pct, &["OFFERHUB_PRICING_MARKUP_PCT"]),
        field("scoring.quotation", weights(&config.scoring.quotation), &[]),
        field("scoring.catalog", weights(&config.scoring.catalog), &[]),
        field(
            "orders.order_number_prefix",
            &config.orders.order_number_prefix,
            &["OFFERHUB_ORDERS_ORDER_NUMBER_PREFIX"],
        ),
        field(
            "orders.shipping_delay_days",
            config.orders.shipping_delay_days,
            &["OFFERHUB_ORDERS_SHIPPING_DELAY_DAYS"],
        ),
        field("orders.fallback_ship_days", config.orders.fallback_ship_days, &[]),
        field("orders.fallback_delivery_days", config.orders.fallback_delivery_days, &[]),
        field(
            "logging.level",
            &config.logging.level,
            &["OFFERHUB_LOGGING_LEVEL", "OFFERHUB_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["OFFERHUB_LOGGING_FORMAT", "OFFERHUB_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        format!("- {} = {} (source: {})", field.key, field.value, sources.of(field.key, field.env_keys))
    }));
    lines.join("\n")
}

fn load_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use offerhub_core::config::AppConfig;
    use toml::Value;

    use super::{contains_path, render, Sources};

    #[test]
    fn file_keys_are_attributed_to_the_file() {
        let doc: Value = "[pricing]\nmarkup_pct = 15\n\n[[distributors]]\nid = \"north\"\n"
            .parse()
            .expect("toml");
        let sources = Sources { file_path: Some("offerhub.toml".into()), file_doc: Some(doc) };

        assert_eq!(sources.of("pricing.markup_pct", &[]), "file (offerhub.toml)");
        assert_eq!(sources.of("distributors", &[]), "file (offerhub.toml)");
        assert_eq!(sources.of("server.port", &[]), "default");
    }

    #[test]
    fn nested_paths_must_exist_all_the_way_down() {
        let doc: Value = "[orders]\nshipping_delay_days = 1\n".parse().expect("toml");

        assert!(contains_path(&doc, "orders.shipping_delay_days"));
        assert!(!contains_path(&doc, "orders.fallback_ship_days"));
        assert!(!contains_path(&doc, "logging.level"));
    }

    #[test]
    fn rendering_lists_every_distributor() {
        let sources = Sources { file_path: None, file_doc: None };

        let rendered = render(&AppConfig::default(), &sources);

        let line = rendered
            .lines()
            .find(|line| line.starts_with("- distributors = "))
            .expect("distributors line");
        assert_eq!(line.matches('=').count(), 1 + AppConfig::default().distributors.len());
        assert!(rendered.contains("- pricing.markup_pct = 20"));
    }
}
