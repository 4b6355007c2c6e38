use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub scraper: ScraperSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Browser,
    Http,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScraperSettings {
    pub extractor: ExtractorKind,
    pub base_url: String,
    pub export_file_name: String,
    pub browser: BrowserSettings,
    pub http: HttpSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BrowserSettings {
    pub step_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub render_timeout_secs: u64,
    pub driver_startup_timeout_secs: u64,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Acquisition strategies, tried in order.
    pub drivers: Vec<DriverSource>,
}

impl BrowserSettings {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn driver_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.driver_startup_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverSource {
    Managed {
        manifest_url: String,
        cache_dir: Option<PathBuf>,
    },
    FixedPath {
        path: PathBuf,
    },
    SystemPath {
        binary: String,
    },
    Remote {
        url: String,
    },
}

#[derive(Deserialize, Clone, Debug)]
pub struct HttpSettings {
    pub search_path: String,
    pub timeout_secs: u64,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Message(e.to_string()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
