use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::distributor::{Distributor, DistributorId};
use crate::pricing::RetailMarkup;
use crate::scoring::{ScoringProfile, ScoringWeights, StockScoring};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub distributors: Vec<Distributor>,
    pub pricing: PricingConfig,
    pub scoring: ScoringConfig,
    pub orders: OrdersConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    /// Local distributor stubs commonly serve self-signed certificates.
    pub accept_invalid_certs: bool,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub markup_pct: Decimal,
}

impl PricingConfig {
    pub fn markup(&self) -> RetailMarkup {
        RetailMarkup::new(self.markup_pct)
    }
}

#[derive(Clone, Debug)]
pub struct ScoringConfig {
    pub quotation: ScoringProfile,
    pub catalog: ScoringProfile,
}

#[derive(Clone, Debug)]
pub struct OrdersConfig {
    pub order_number_prefix: String,
    pub shipping_delay_days: u32,
    pub fallback_ship_days: u32,
    pub fallback_delivery_days: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub server_port: Option<u16>,
    pub markup_pct: Option<Decimal>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://offerhub.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            gateway: GatewayConfig {
                request_timeout_secs: 30,
                probe_timeout_secs: 10,
                accept_invalid_certs: false,
            },
            distributors: default_distributors(),
            pricing: PricingConfig { markup_pct: Decimal::from(20) },
            scoring: ScoringConfig {
                quotation: ScoringProfile::quotation(),
                catalog: ScoringProfile::catalog(),
            },
            orders: OrdersConfig {
                order_number_prefix: "OH".to_string(),
                shipping_delay_days: 2,
                fallback_ship_days: 3,
                fallback_delivery_days: 7,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

pub fn default_distributors() -> Vec<Distributor> {
    [
        ("electrocom", "ElectroCom", "https://localhost:7077", 3),
        ("techworld", "TechWorld", "https://localhost:7102", 5),
        ("gadgetcentral", "GadgetCentral", "https://localhost:7007", 4),
    ]
    .into_iter()
    .map(|(id, name, base_url, catalog_delivery_days)| Distributor {
        id: DistributorId::new(id),
        name: name.to_string(),
        base_url: base_url.to_string(),
        catalog_delivery_days,
    })
    .collect()
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("offerhub.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn distributor(&self, id: &DistributorId) -> Option<&Distributor> {
        self.distributors.iter().find(|distributor| &distributor.id == id)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(gateway) = patch.gateway {
            if let Some(request_timeout_secs) = gateway.request_timeout_secs {
                self.gateway.request_timeout_secs = request_timeout_secs;
            }
            if let Some(probe_timeout_secs) = gateway.probe_timeout_secs {
                self.gateway.probe_timeout_secs = probe_timeout_secs;
            }
            if let Some(accept_invalid_certs) = gateway.accept_invalid_certs {
                self.gateway.accept_invalid_certs = accept_invalid_certs;
            }
        }

        if let Some(distributors) = patch.distributors {
            self.distributors = distributors
                .into_iter()
                .map(|entry| Distributor {
                    name: entry.name.unwrap_or_else(|| entry.id.clone()),
                    id: DistributorId::new(entry.id),
                    base_url: entry.base_url,
                    catalog_delivery_days: entry.catalog_delivery_days.unwrap_or(3),
                })
                .collect();
        }

        if let Some(pricing) = patch.pricing {
            if let Some(markup_pct) = pricing.markup_pct {
                self.pricing.markup_pct = markup_pct;
            }
        }

        if let Some(scoring) = patch.scoring {
            if let Some(quotation) = scoring.quotation {
                quotation.apply_to(&mut self.scoring.quotation);
            }
            if let Some(catalog) = scoring.catalog {
                catalog.apply_to(&mut self.scoring.catalog);
            }
        }

        if let Some(orders) = patch.orders {
            if let Some(prefix) = orders.order_number_prefix {
                self.orders.order_number_prefix = prefix;
            }
            if let Some(days) = orders.shipping_delay_days {
                self.orders.shipping_delay_days = days;
            }
            if let Some(days) = orders.fallback_ship_days {
                self.orders.fallback_ship_days = days;
            }
            if let Some(days) = orders.fallback_delivery_days {
                self.orders.fallback_delivery_days = days;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("OFFERHUB_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("OFFERHUB_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("OFFERHUB_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("OFFERHUB_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("OFFERHUB_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("OFFERHUB_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("OFFERHUB_SERVER_PORT") {
            self.server.port = parse_u16("OFFERHUB_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("OFFERHUB_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("OFFERHUB_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("OFFERHUB_GATEWAY_REQUEST_TIMEOUT_SECS") {
            self.gateway.request_timeout_secs =
                parse_u64("OFFERHUB_GATEWAY_REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OFFERHUB_GATEWAY_PROBE_TIMEOUT_SECS") {
            self.gateway.probe_timeout_secs =
                parse_u64("OFFERHUB_GATEWAY_PROBE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("OFFERHUB_GATEWAY_ACCEPT_INVALID_CERTS") {
            self.gateway.accept_invalid_certs =
                parse_bool("OFFERHUB_GATEWAY_ACCEPT_INVALID_CERTS", &value)?;
        }

        if let Some(value) = read_env("OFFERHUB_DISTRIBUTORS") {
            self.distributors = parse_distributor_list(&value, &self.distributors)?;
        }

        if let Some(value) = read_env("OFFERHUB_PRICING_MARKUP_PCT") {
            self.pricing.markup_pct = parse_decimal("OFFERHUB_PRICING_MARKUP_PCT", &value)?;
        }

        if let Some(value) = read_env("OFFERHUB_ORDERS_ORDER_NUMBER_PREFIX") {
            self.orders.order_number_prefix = value;
        }
        if let Some(value) = read_env("OFFERHUB_ORDERS_SHIPPING_DELAY_DAYS") {
            self.orders.shipping_delay_days =
                parse_u32("OFFERHUB_ORDERS_SHIPPING_DELAY_DAYS", &value)?;
        }

        let log_level =
            read_env("OFFERHUB_LOGGING_LEVEL").or_else(|| read_env("OFFERHUB_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OFFERHUB_LOGGING_FORMAT").or_else(|| read_env("OFFERHUB_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(markup_pct) = overrides.markup_pct {
            self.pricing.markup_pct = markup_pct;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_gateway(&self.gateway)?;
        validate_distributors(&self.distributors)?;
        validate_pricing(&self.pricing)?;
        validate_scoring("scoring.quotation", &self.scoring.quotation)?;
        validate_scoring("scoring.catalog", &self.scoring.catalog)?;
        validate_orders(&self.orders)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("offerhub.toml"), PathBuf::from("config/offerhub.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

/// `id=url[,id=url...]`. Known ids keep their display name and delivery days.
fn parse_distributor_list(
    value: &str,
    current: &[Distributor],
) -> Result<Vec<Distributor>, ConfigError> {
    let invalid = || ConfigError::InvalidEnvOverride {
        key: "OFFERHUB_DISTRIBUTORS".to_string(),
        value: value.to_string(),
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, base_url) = entry.split_once('=').ok_or_else(invalid)?;
            let id = DistributorId::new(id);
            if id.as_str().is_empty() || base_url.trim().is_empty() {
                return Err(invalid());
            }
            let known = current.iter().find(|distributor| distributor.id == id);
            Ok(Distributor {
                name: known
                    .map(|distributor| distributor.name.clone())
                    .unwrap_or_else(|| id.0.clone()),
                catalog_delivery_days: known
                    .map(|distributor| distributor.catalog_delivery_days)
                    .unwrap_or(3),
                base_url: base_url.trim().to_string(),
                id,
            })
        })
        .collect()
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_gateway(gateway: &GatewayConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("gateway.request_timeout_secs", gateway.request_timeout_secs),
        ("gateway.probe_timeout_secs", gateway.probe_timeout_secs),
    ] {
        if value == 0 || value > 300 {
            return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
        }
    }
    Ok(())
}

fn validate_distributors(distributors: &[Distributor]) -> Result<(), ConfigError> {
    if distributors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[distributors]] entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for distributor in distributors {
        if distributor.id.as_str().is_empty() {
            return Err(ConfigError::Validation("distributors.id must not be empty".to_string()));
        }
        if !seen.insert(distributor.id.clone()) {
            return Err(ConfigError::Validation(format!(
                "distributor id `{}` is configured more than once",
                distributor.id
            )));
        }
        let url = distributor.base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "distributors.base_url for `{}` must start with http:// or https://",
                distributor.id
            )));
        }
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.markup_pct < Decimal::ZERO || pricing.markup_pct > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(
            "pricing.markup_pct must be in range 0..=100".to_string(),
        ));
    }
    Ok(())
}

fn validate_scoring(section: &str, profile: &ScoringProfile) -> Result<(), ConfigError> {
    let weights = profile.weights;
    if [weights.price, weights.stock, weights.delivery].iter().any(|weight| *weight < Decimal::ZERO)
    {
        return Err(ConfigError::Validation(format!("{section} weights must not be negative")));
    }
    if weights.sum() != Decimal::ONE {
        return Err(ConfigError::Validation(format!(
            "{section} weights must sum to 1 (got {})",
            weights.sum()
        )));
    }
    if let StockScoring::LinearCap { reference: 0 } = profile.stock {
        return Err(ConfigError::Validation(format!(
            "{section}.stock_reference must be greater than zero"
        )));
    }
    Ok(())
}

fn validate_orders(orders: &OrdersConfig) -> Result<(), ConfigError> {
    let prefix = orders.order_number_prefix.trim();
    if prefix.is_empty() || !prefix.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(ConfigError::Validation(
            "orders.order_number_prefix must be non-empty and alphanumeric".to_string(),
        ));
    }
    if orders.fallback_delivery_days < orders.fallback_ship_days {
        return Err(ConfigError::Validation(
            "orders.fallback_delivery_days must not precede orders.fallback_ship_days".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    gateway: Option<GatewayPatch>,
    distributors: Option<Vec<DistributorPatch>>,
    pricing: Option<PricingPatch>,
    scoring: Option<ScoringPatch>,
    orders: Option<OrdersPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    request_timeout_secs: Option<u64>,
    probe_timeout_secs: Option<u64>,
    accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DistributorPatch {
    id: String,
    name: Option<String>,
    base_url: String,
    catalog_delivery_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    markup_pct: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    quotation: Option<ScoringProfilePatch>,
    catalog: Option<ScoringProfilePatch>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StockRule {
    MinMax,
    LinearCap,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringProfilePatch {
    price: Option<Decimal>,
    stock: Option<Decimal>,
    delivery: Option<Decimal>,
    stock_rule: Option<StockRule>,
    stock_reference: Option<u32>,
}

impl ScoringProfilePatch {
    fn apply_to(self, profile: &mut ScoringProfile) {
        let current = profile.weights;
        profile.weights = ScoringWeights {
            price: self.price.unwrap_or(current.price),
            stock: self.stock.unwrap_or(current.stock),
            delivery: self.delivery.unwrap_or(current.delivery),
        };

        let current_reference = match profile.stock {
            StockScoring::LinearCap { reference } => reference,
            StockScoring::MinMax => 50,
        };
        let rule = self.stock_rule.unwrap_or(match profile.stock {
            StockScoring::MinMax => StockRule::MinMax,
            StockScoring::LinearCap { .. } => StockRule::LinearCap,
        });
        profile.stock = match rule {
            StockRule::MinMax => StockScoring::MinMax,
            StockRule::LinearCap => StockScoring::LinearCap {
                reference: self.stock_reference.unwrap_or(current_reference),
            },
        };
    }
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPatch {
    order_number_prefix: Option<String>,
    shipping_delay_days: Option<u32>,
    fallback_ship_days: Option<u32>,
    fallback_delivery_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::distributor::DistributorId;
    use crate::scoring::StockScoring;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_describe_three_local_distributors() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        let days: Vec<u32> =
            config.distributors.iter().map(|distributor| distributor.catalog_delivery_days).collect();
        ensure(days == vec![3, 5, 4], "default catalog delivery days should be 3, 5, 4")?;
        ensure(config.gateway.request_timeout_secs == 30, "request timeout defaults to 30s")?;
        ensure(config.gateway.probe_timeout_secs == 10, "probe timeout defaults to 10s")?;
        ensure(config.pricing.markup_pct == Decimal::from(20), "markup defaults to 20%")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_NORTH_URL", "http://north.internal:9000");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerhub.toml");
            fs::write(
                &path,
                r#"
[[distributors]]
id = "North"
name = "North Supply"
base_url = "${TEST_NORTH_URL}"
catalog_delivery_days = 2
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.distributors.len() == 1, "file list should replace the defaults")?;
            let north = config
                .distributor(&DistributorId::new("north"))
                .ok_or_else(|| "north should be configured".to_string())?;
            ensure(
                north.base_url == "http://north.internal:9000",
                "base url should be interpolated from the environment",
            )?;
            ensure(north.name == "North Supply", "display name should come from the file")?;
            Ok(())
        })();

        clear_vars(&["TEST_NORTH_URL"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERHUB_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("OFFERHUB_PRICING_MARKUP_PCT", "15");
        env::set_var("OFFERHUB_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerhub.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[pricing]
markup_pct = 25

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.pricing.markup_pct == Decimal::from(15),
                "env markup should win over the file",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "log format alias should be read from env",
            )?;
            Ok(())
        })();

        clear_vars(&["OFFERHUB_DATABASE_URL", "OFFERHUB_PRICING_MARKUP_PCT", "OFFERHUB_LOG_FORMAT"]);
        result
    }

    #[test]
    fn distributor_list_env_keeps_known_metadata() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var(
            "OFFERHUB_DISTRIBUTORS",
            "techworld=http://127.0.0.1:7102, outlet=http://127.0.0.1:7200",
        );

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.distributors.len() == 2, "env list should replace the defaults")?;
            ensure(
                config.distributors[0].name == "TechWorld"
                    && config.distributors[0].catalog_delivery_days == 5,
                "known distributor keeps its name and delivery days",
            )?;
            ensure(
                config.distributors[1].id == DistributorId::new("outlet")
                    && config.distributors[1].catalog_delivery_days == 3,
                "new distributor gets default metadata",
            )?;
            Ok(())
        })();

        clear_vars(&["OFFERHUB_DISTRIBUTORS"]);
        result
    }

    #[test]
    fn scoring_profile_can_be_tuned_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("offerhub.toml");
        fs::write(
            &path,
            r#"
[scoring.catalog]
price = "0.5"
stock = "0.2"
delivery = "0.3"
stock_reference = 20
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.scoring.catalog.weights.price == Decimal::new(5, 1), "price weight tuned")?;
        ensure(
            config.scoring.catalog.stock == StockScoring::LinearCap { reference: 20 },
            "stock reference tuned",
        )?;
        ensure(
            config.scoring.quotation.stock == StockScoring::MinMax,
            "quotation profile untouched",
        )
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERHUB_DISTRIBUTORS", "north=ftp://north.example");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("distributors.base_url")
            );
            ensure(has_message, "validation failure should mention distributors.base_url")
        })();

        clear_vars(&["OFFERHUB_DISTRIBUTORS"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported_with_its_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERHUB_SERVER_PORT", "eighty");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "OFFERHUB_SERVER_PORT", "error should name the offending key")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("malformed port should be rejected".to_string()),
        };

        clear_vars(&["OFFERHUB_SERVER_PORT"]);
        result
    }

    #[test]
    fn unbalanced_weights_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("offerhub.toml");
        fs::write(&path, "[scoring.quotation]\nprice = \"0.7\"\n").map_err(|err| err.to_string())?;

        let error =
            match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
            {
                Ok(_) => return Err("weights summing to 1.1 should be rejected".to_string()),
                Err(error) => error,
            };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("scoring.quotation")),
            "validation failure should name the scoring section",
        )
    }
}
