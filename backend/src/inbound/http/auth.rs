//! Account handlers: login, registration, logout and session validation.
//!
//! ```text
//! POST /api/auth/login {"username":"admin","password":"password"}
//! POST /api/auth/register {"username":"somchai","user_tel":"0812345678",...}
//! POST /api/auth/logout
//! GET  /api/auth/validate
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    Error, ErrorCode, LoginCredentials, LoginValidationError, Registration, RegistrationParts,
    User,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::map_registration_error;

/// Login request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Registration request body. Every field is required; missing ones are
/// reported together as `missing_fields`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    #[schema(example = "0812345678")]
    pub user_tel: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    #[schema(example = "Somchai Jaidee")]
    pub name: Option<String>,
}

impl RegisterRequest {
    fn parts(&self) -> RegistrationParts<'_> {
        RegistrationParts {
            username: self.username.as_deref(),
            phone: self.user_tel.as_deref(),
            password: self.password.as_deref(),
            confirm_password: self.confirm_password.as_deref(),
            name: self.name.as_deref(),
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub user_id: i32,
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "0800000000")]
    pub user_tel: String,
    #[schema(example = "Demo Farmer")]
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id().get(),
            username: user.username().as_ref().to_owned(),
            user_tel: user.phone().as_ref().to_owned(),
            name: user.display_name().as_ref().to_owned(),
        }
    }
}

/// `{"user": {...}}` envelope shared by the account endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

impl From<&User> for UserEnvelope {
    fn from(user: &User) -> Self {
        Self {
            user: UserResponse::from(user),
        }
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => Error::invalid_request("username must not be empty")
            .with_details(json!({ "field": "username", "code": "empty_username" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

/// Resolve the session user, purging sessions whose account is gone.
pub(crate) async fn current_user(state: &HttpState, session: &SessionContext) -> ApiResult<User> {
    let user_id = session.require_user_id()?;
    match state.profile.fetch_user(user_id).await {
        Err(err) if err.code() == ErrorCode::Unauthorized => {
            session.purge();
            Err(err)
        }
        other => other,
    }
}

/// Authenticate a user and establish a session.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserEnvelope,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<UserEnvelope>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let user = state.login.authenticate(&credentials).await?;
    session.persist_user(user.id())?;
    Ok(web::Json(UserEnvelope::from(&user)))
}

/// Create an account and sign it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserEnvelope,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Username or phone already registered", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = Registration::try_from_parts(payload.parts())
        .map_err(|err| map_registration_error(&err))?;
    let user = state.registration.register(&registration).await?;
    session.persist_user(user.id())?;
    Ok(HttpResponse::Created().json(UserEnvelope::from(&user)))
}

/// Drop the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/auth/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().finish()
}

/// Confirm the session still refers to an existing account.
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    responses(
        (status = 200, description = "Session is valid", body = UserEnvelope),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "validateSession",
    security(("SessionCookie" = []))
)]
#[get("/auth/validate")]
pub async fn validate(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserEnvelope>> {
    let user = current_user(&state, &session).await?;
    Ok(web::Json(UserEnvelope::from(&user)))
}

/// Register the session and account routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(register)
        .service(logout)
        .service(validate);
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
