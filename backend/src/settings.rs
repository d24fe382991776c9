//! Application settings loaded via OrthoConfig.
//!
//! Every value may come from a `--flag` or a `COCOA_*` environment variable.
//! Only the session secrets are read separately, see
//! [`crate::inbound::http::session_config`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_UPLOAD_ROOT: &str = "uploads";
const DEFAULT_DETECTOR_TIMEOUT_SECS: u64 = 60;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("invalid bind address '{value}': {message}")]
    BindAddr { value: String, message: String },
    /// The detector base URL cannot be parsed.
    #[error("invalid detector url '{value}': {message}")]
    DetectorUrl { value: String, message: String },
}

/// Runtime configuration of the API server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COCOA")]
pub struct AppSettings {
    /// Socket address to listen on, `0.0.0.0:8080` by default.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. Without it the server runs on fixture adapters.
    pub database_url: Option<String>,
    /// Upper bound of the connection pool.
    #[ortho_config(default = DEFAULT_DB_MAX_CONNECTIONS)]
    pub db_max_connections: u32,
    /// Directory receiving inspection images.
    pub upload_root: Option<PathBuf>,
    /// Base URL of the inference service.
    pub detector_url: Option<String>,
    /// Per-request timeout for the inference service, in seconds.
    #[ortho_config(default = DEFAULT_DETECTOR_TIMEOUT_SECS)]
    pub detector_timeout_secs: u64,
    /// Extra allowed CORS origins. The environment form is comma separated.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl AppSettings {
    /// Address to bind, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.trim()
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
                value: raw.to_owned(),
                message: err.to_string(),
            })
    }

    /// Configured database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Pool size, at least one connection.
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections.max(1)
    }

    /// Upload directory, `uploads` by default.
    pub fn upload_root(&self) -> PathBuf {
        self.upload_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_ROOT))
    }

    /// Parsed inference service URL, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::DetectorUrl`] when the value does not parse.
    pub fn detector_url(&self) -> Result<Option<Url>, SettingsError> {
        self.detector_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|raw| {
                Url::parse(raw).map_err(|err| SettingsError::DetectorUrl {
                    value: raw.to_owned(),
                    message: err.to_string(),
                })
            })
            .transpose()
    }

    /// Inference request timeout.
    pub fn detector_timeout(&self) -> Duration {
        Duration::from_secs(self.detector_timeout_secs)
    }

    /// Extra CORS origins, trimmed, blanks dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 7] = [
        "COCOA_BIND_ADDR",
        "COCOA_DATABASE_URL",
        "COCOA_DB_MAX_CONNECTIONS",
        "COCOA_UPLOAD_ROOT",
        "COCOA_DETECTOR_URL",
        "COCOA_DETECTOR_TIMEOUT_SECS",
        "COCOA_CORS_ORIGINS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("cocoa-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket address")
        );
        assert!(settings.database_url().is_none());
        assert_eq!(settings.db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
        assert_eq!(settings.upload_root(), PathBuf::from("uploads"));
        assert_eq!(settings.detector_url(), Ok(None));
        assert_eq!(settings.detector_timeout(), Duration::from_secs(60));
        assert!(settings.cors_origins().is_empty());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("COCOA_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("COCOA_DATABASE_URL", Some("postgres://localhost/cocoa".to_owned())),
            ("COCOA_DB_MAX_CONNECTIONS", Some("0".to_owned())),
            ("COCOA_UPLOAD_ROOT", Some("/srv/uploads".to_owned())),
            ("COCOA_DETECTOR_URL", Some("http://detector:5000/v1".to_owned())),
            ("COCOA_DETECTOR_TIMEOUT_SECS", Some("5".to_owned())),
            (
                "COCOA_CORS_ORIGINS",
                Some("https://farm.example.com, ,https://m.farm.example.com".to_owned()),
            ),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("address"),
            "127.0.0.1:9000".parse::<SocketAddr>().expect("socket address")
        );
        assert_eq!(settings.database_url(), Some("postgres://localhost/cocoa"));
        assert_eq!(settings.db_max_connections(), 1);
        assert_eq!(settings.upload_root(), PathBuf::from("/srv/uploads"));
        assert_eq!(
            settings
                .detector_url()
                .expect("valid url")
                .map(|url| url.to_string()),
            Some("http://detector:5000/v1".to_owned())
        );
        assert_eq!(settings.detector_timeout(), Duration::from_secs(5));
        assert_eq!(
            settings.cors_origins(),
            vec!["https://farm.example.com", "https://m.farm.example.com"]
        );
    }

    fn settings_with(bind_addr: Option<&str>, detector_url: Option<&str>) -> AppSettings {
        AppSettings {
            bind_addr: bind_addr.map(str::to_owned),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            upload_root: None,
            detector_url: detector_url.map(str::to_owned),
            detector_timeout_secs: DEFAULT_DETECTOR_TIMEOUT_SECS,
            cors_origins: Vec::new(),
        }
    }

    #[rstest]
    fn single_cors_origin_loads() {
        let _guard = lock_env(
            VARS.map(|name| (name, None::<String>))
                .map(|(name, value)| match name {
                    "COCOA_CORS_ORIGINS" => (name, Some("https://farm.example.com".to_owned())),
                    _ => (name, value),
                }),
        );

        let settings = load_from_empty_args();
        assert_eq!(settings.cors_origins(), vec!["https://farm.example.com"]);
    }

    #[rstest]
    #[case(Some("not an address"))]
    #[case(Some("localhost"))]
    fn bad_bind_addresses_are_reported(#[case] raw: Option<&str>) {
        let settings = settings_with(raw, None);
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }

    #[rstest]
    fn bad_detector_url_is_reported() {
        let settings = settings_with(None, Some("::nope"));
        assert!(matches!(
            settings.detector_url(),
            Err(SettingsError::DetectorUrl { .. })
        ));
    }
}
