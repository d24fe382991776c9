//! Health endpoints: liveness & readiness probes for orchestration and load balancers,
//! plus the service index at `/`.
use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use utoipa::ToSchema;

/// Shared health state for readiness and liveness checks.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503.
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Readiness probe. 200 once the pool and adapters are wired, 503 before.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is not ready")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. 200 while the process is marked alive and 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

/// Entry points advertised by the service index.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexEndpoints {
    pub auth: &'static str,
    pub user: &'static str,
    pub health: &'static str,
    pub fields: &'static str,
    pub zones: &'static str,
    pub marks: &'static str,
    pub inspections: &'static str,
    pub reference: &'static str,
    pub detect: &'static str,
}

/// Service index body.
#[derive(Debug, Serialize, ToSchema)]
pub struct IndexResponse {
    #[schema(example = "Cocoa Farm Management API")]
    pub message: &'static str,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    pub endpoints: IndexEndpoints,
}

const SERVICE_NAME: &str = "Cocoa Farm Management API";

/// Describe the service and its main entry points.
#[utoipa::path(
    get,
    path = "/",
    tags = ["health"],
    security([]),
    responses((status = 200, description = "Service index", body = IndexResponse))
)]
#[get("/")]
pub async fn index() -> web::Json<IndexResponse> {
    web::Json(IndexResponse {
        message: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: IndexEndpoints {
            auth: "/api/auth",
            user: "/api/user/info",
            health: "/health/ready",
            fields: "/api/fields",
            zones: "/api/zones",
            marks: "/api/zones/{zone_id}/marks",
            inspections: "/api/inspections",
            reference: "/api/reference",
            detect: "/api/detect",
        },
    })
}
