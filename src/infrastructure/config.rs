use crate::application::direction_resolver::Strategy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Placeholder for the line id in the itinerary path template
pub const LINE_PLACEHOLDER: &str = "$$";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub tracking: TrackingSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    pub host: String,
    pub bus_paths: Vec<String>,
    pub itinerary_path: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            host: "dadosabertos.rio.rj.gov.br".to_string(),
            bus_paths: vec![
                "/apitransporte/apresentacao/rest/index.cfm/onibus".to_string(),
                "/apitransporte/apresentacao/rest/index.cfm/brt".to_string(),
            ],
            itinerary_path: "/apiTransporte/Apresentacao/csv/gtfs/onibus/percursos/gtfs_linha$$-shapes.csv"
                .to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ProviderSettings {
    pub fn bus_urls(&self) -> Vec<String> {
        self.bus_paths
            .iter()
            .map(|path| format!("http://{}{}", self.host, path))
            .collect()
    }

    pub fn itinerary_url(&self, line_id: &str) -> String {
        let path = self
            .itinerary_path
            .replace(LINE_PLACEHOLDER, &urlencoding::encode(line_id));
        format!("http://{}{}", self.host, path)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    File,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistorySettings {
    pub size: usize,
    pub store: StoreKind,
    pub directory: String,
    pub timeout_ms: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            size: 10,
            store: StoreKind::File,
            directory: "/tmp/riobus/cache".to_string(),
            timeout_ms: 2_000,
        }
    }
}

impl HistorySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrackingSettings {
    pub update_interval_ms: u64,
    pub workers: usize,
    pub strategy: Strategy,
    pub strategy_overrides: HashMap<String, Strategy>,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: 5_000,
            workers: 8,
            strategy: Strategy::Temporal,
            strategy_overrides: HashMap::new(),
        }
    }
}

impl TrackingSettings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Loads `config/app.{toml,yaml,json}` when present, then `BUS_SENSE__*`
/// environment variables (e.g. `BUS_SENSE__TRACKING__STRATEGY=geometric`,
/// `BUS_SENSE__PROVIDER__BUS_PATHS=/onibus,/brt`).
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("BUS_SENSE")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("provider.bus_paths")
}
