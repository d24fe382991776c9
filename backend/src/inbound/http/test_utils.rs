//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};

use crate::domain::ports::MockDetectionQuery;
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::{json_error_handler, query_error_handler};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Fixture ports with a detection double that fails the test if called.
pub fn fixture_ports() -> HttpStatePorts {
    HttpStatePorts::fixtures(Arc::new(MockDetectionQuery::new()))
}

async fn sign_in_as(session: SessionContext, id: web::Path<i32>) -> ApiResult<HttpResponse> {
    let id = UserId::new(id.into_inner()).map_err(|err| Error::invalid_request(err.to_string()))?;
    session.persist_user(id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// App with session middleware, the given state, the `/api` scope filled by
/// `configure`, and a `/test/sign-in/{id}` shortcut for authenticated calls.
pub fn test_app(
    state: HttpState,
    configure: impl FnOnce(&mut web::ServiceConfig),
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .wrap(test_session_middleware())
        .route("/test/sign-in/{id}", web::post().to(sign_in_as))
        .service(web::scope("/api").configure(configure))
}

/// Extract the `session` cookie set by a response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Sign in as `user_id` through the test shortcut and return the cookie.
pub async fn signed_in(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    user_id: i32,
) -> Cookie<'static> {
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri(&format!("/test/sign-in/{user_id}"))
            .to_request(),
    )
    .await;
    assert!(res.status().is_success(), "sign-in shortcut failed");
    session_cookie(&res)
}
