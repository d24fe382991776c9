//! Current user handler.
//!
//! ```text
//! GET /api/user/info
//! ```

use actix_web::{get, web};

use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{UserEnvelope, current_user};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Fetch the signed-in user's profile.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use backend::inbound::http::users::user_info;
///
/// let app = App::new().service(user_info);
/// ```
#[utoipa::path(
    get,
    path = "/api/user/info",
    responses(
        (status = 200, description = "Current user", body = UserEnvelope),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser",
    security(("SessionCookie" = []))
)]
#[get("/user/info")]
pub async fn user_info(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserEnvelope>> {
    let user = current_user(&state, &session).await?;
    Ok(web::Json(UserEnvelope::from(&user)))
}

/// Register the profile routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(user_info);
}
