use crate::groq::DEFAULT_GROQ_BASE_URL;
use crate::nse::DEFAULT_NSE_BASE_URL;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub service_name: Option<String>,
    pub groq_api_key: String,
    pub groq_model: Option<String>,
    pub groq_base_url: Option<String>,
    pub nse_base_url: Option<String>,
    pub transcript_languages: Option<Vec<String>>,
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub http_timeout_secs: Option<u64>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service_name: String,
    pub groq_api_key: String,
    pub groq_model: Option<String>,
    pub groq_base_url: String,
    pub nse_base_url: String,
    pub transcript_languages: Vec<String>,
    pub host: IpAddr,
    pub port: u16,
    pub http_timeout: Option<Duration>,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables.
    // `.env` is loaded once by the binaries before this runs.
    pub fn load(default_service_name: &str) -> Result<Self, ConfigError> {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file, default_service_name)
        } else {
            Self::from_env(default_service_name)
        }
    }

    pub fn from_yaml(file_path: &str, default_service_name: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml_content, default_service_name)
    }

    pub fn from_yaml_str(yaml_content: &str, default_service_name: &str) -> Result<Self, ConfigError> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;
        if yaml_config.groq_api_key.trim().is_empty() {
            return Err(ConfigError::Missing("groq_api_key"));
        }

        Ok(Self {
            service_name: yaml_config
                .service_name
                .unwrap_or_else(|| default_service_name.to_string()),
            groq_api_key: yaml_config.groq_api_key,
            groq_model: yaml_config.groq_model.filter(|m| !m.is_empty()),
            groq_base_url: yaml_config
                .groq_base_url
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            nse_base_url: yaml_config
                .nse_base_url
                .unwrap_or_else(|| DEFAULT_NSE_BASE_URL.to_string()),
            transcript_languages: yaml_config
                .transcript_languages
                .filter(|langs| !langs.is_empty())
                .unwrap_or_else(|| vec!["en".to_string()]),
            host: yaml_config.host.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            port: yaml_config.port.unwrap_or(DEFAULT_PORT),
            http_timeout: yaml_config.http_timeout_secs.map(Duration::from_secs),
        })
    }

    // Load all configuration from environment variables
    pub fn from_env(default_service_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(default_service_name, |key| env::var(key).ok())
    }

    fn from_lookup<F>(default_service_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let groq_api_key = lookup("GROQ_API_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("GROQ_API_KEY"))?;

        let groq_model = lookup("GROQ_MODEL").filter(|s| !s.is_empty());

        let groq_base_url = lookup("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string());

        let nse_base_url = lookup("NSE_BASE_URL").unwrap_or_else(|| DEFAULT_NSE_BASE_URL.to_string());

        let transcript_languages = lookup("TRANSCRIPT_LANGUAGES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect::<Vec<String>>()
            })
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| vec!["en".to_string()]);

        let host = match lookup("HOST") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "HOST", value })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match lookup("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(value.parse().map_err(|_| {
                ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    value,
                }
            })?)),
            None => None,
        };

        let service_name = lookup("SERVICE_NAME").unwrap_or_else(|| default_service_name.to_string());

        Ok(Self {
            service_name,
            groq_api_key,
            groq_model,
            groq_base_url,
            nse_base_url,
            transcript_languages,
            host,
            port,
            http_timeout,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
