//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use backend::outbound::persistence::DbPool;
use url::Url;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) upload_root: PathBuf,
    pub(crate) detector: Option<(Url, Duration)>,
    pub(crate) cors_origins: Vec<String>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration from session settings and the bind
    /// address. Storage defaults to `uploads` and the detector to the fixture.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            db_pool: None,
            upload_root: PathBuf::from("uploads"),
            detector: None,
            cors_origins: Vec::new(),
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// Without one the server answers from fixture adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Directory receiving inspection images.
    #[must_use]
    pub fn with_upload_root(mut self, root: PathBuf) -> Self {
        self.upload_root = root;
        self
    }

    /// Use the inference service at `url`.
    #[must_use]
    pub fn with_detector(mut self, url: Url, timeout: Duration) -> Self {
        self.detector = Some((url, timeout));
        self
    }

    /// Origins allowed by CORS in addition to local development hosts.
    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
