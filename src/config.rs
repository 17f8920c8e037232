use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub tariff_api: TariffApiConfig,
    /// Replaces the built-in static tariff table when set.
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            request_timeout_secs: 30,
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffApiConfig {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    /// 0 disables caching of external plans.
    pub cache_ttl_seconds: u64,
}

impl Default for TariffApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            timeout_ms: 5000,
            cache_ttl_seconds: 0,
        }
    }
}

impl TariffApiConfig {
    /// Base URL of the external source, if it should be consulted at all.
    pub fn active_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Ok(Self::figment().extract()?)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::raw().only(&["TARIFF_API_URL"]).map(|_| "tariff_api.base_url".into()))
            .merge(Env::raw().only(&["TARIFF_API_KEY"]).map(|_| "tariff_api.api_key".into()))
            .merge(Env::prefixed("TARIFF_ENGINE__").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_sources() {
        Jail::expect_with(|_| {
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.server.port, 5000);
            assert_eq!(cfg.log.format, LogFormat::Json);
            assert_eq!(cfg.tariff_api.timeout(), Duration::from_secs(5));
            assert!(cfg.tariff_api.active_url().is_none());
            assert!(cfg.tariff_api.cache_ttl().is_none());
            assert!(cfg.catalog_path.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/default.toml",
                r#"
                [server]
                port = 8080

                [log]
                format = "pretty"

                [tariff_api]
                base_url = "https://tariffs.example"
                timeout_ms = 2500
                "#,
            )?;
            jail.set_env("TARIFF_ENGINE__SERVER__HOST", "0.0.0.0");
            jail.set_env("TARIFF_API_KEY", "secret");

            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.server.port, 8080);
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.log.format, LogFormat::Pretty);
            assert_eq!(cfg.tariff_api.active_url(), Some("https://tariffs.example"));
            assert_eq!(cfg.tariff_api.api_key.as_deref(), Some("secret"));
            assert_eq!(cfg.tariff_api.timeout(), Duration::from_millis(2500));
            Ok(())
        });
    }

    #[test]
    fn test_legacy_url_variable_and_toggle() {
        Jail::expect_with(|jail| {
            jail.set_env("TARIFF_API_URL", "http://localhost:9000");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.tariff_api.active_url(), Some("http://localhost:9000"));

            jail.set_env("TARIFF_ENGINE__TARIFF_API__ENABLED", "false");
            let cfg: Config = Config::figment().extract()?;
            assert!(cfg.tariff_api.active_url().is_none());
            Ok(())
        });
    }

    #[test]
    fn test_blank_url_is_inactive() {
        let api = TariffApiConfig {
            base_url: Some("   ".into()),
            ..Default::default()
        };
        assert!(api.active_url().is_none());
    }
}
