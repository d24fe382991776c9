//! Cross-origin middleware for browser and mobile web clients.
//!
//! Origins on `localhost` or `127.0.0.1` (any port, http or https) and any
//! explicitly configured origin are reflected back with credentials allowed,
//! so the session cookie travels with cross-origin requests. Preflight
//! `OPTIONS` requests are answered here with `204 No Content` and never reach
//! the handlers.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::http::Method;
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use url::Url;

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS, HEAD";
const ALLOW_HEADERS: &str = "Authorization, Content-Type, X-Requested-With, Accept";
const EXPOSE_HEADERS: &str = "trace-id";
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// CORS middleware.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use backend::middleware::Cors;
///
/// let app = App::new().wrap(Cors::new(["https://farm.example.com"]));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Cors {
    allowed: Arc<HashSet<String>>,
}

impl Cors {
    /// Allow local development origins plus the listed ones. Entries are
    /// compared after trimming any trailing slash.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = origins
            .into_iter()
            .map(|origin| origin.as_ref().trim().trim_end_matches('/').to_owned())
            .filter(|origin| !origin.is_empty())
            .collect();
        Self {
            allowed: Arc::new(allowed),
        }
    }

    /// Whether `origin` may receive credentialed responses.
    ///
    /// # Examples
    /// ```
    /// use backend::middleware::Cors;
    ///
    /// let cors = Cors::default();
    /// assert!(cors.allows("http://localhost:5173"));
    /// assert!(!cors.allows("https://evil.example"));
    /// ```
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        if self.allowed.contains(origin.trim_end_matches('/')) {
            return true;
        }
        Url::parse(origin).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| LOCAL_HOSTS.contains(&host))
        })
    }

    fn decorate(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSE_HEADERS),
        );
        let Some(origin) = origin else {
            return;
        };
        if origin.to_str().is_ok_and(|raw| self.allows(raw)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Cors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CorsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorsMiddleware {
            service: Rc::new(service),
            cors: self.clone(),
        }))
    }
}

/// Service wrapper produced by [`Cors`].
pub struct CorsMiddleware<S> {
    service: Rc<S>,
    cors: Cors,
}

impl<S, B> Service<ServiceRequest> for CorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let origin = req.headers().get(header::ORIGIN).cloned();
        let cors = self.cors.clone();

        if req.method() == Method::OPTIONS {
            let mut res = req
                .into_response(HttpResponse::NoContent().finish())
                .map_into_right_body();
            cors.decorate(origin.as_ref(), res.headers_mut());
            return Box::pin(async move { Ok(res) });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?.map_into_left_body();
            cors.decorate(origin.as_ref(), res.headers_mut());
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test, web};
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:3000", true)]
    #[case("http://127.0.0.1:8100", true)]
    #[case("https://localhost", true)]
    #[case("https://farm.example.com", true)]
    #[case("https://farm.example.com/", true)]
    #[case("http://localhost.evil.example", false)]
    #[case("file://localhost/etc", false)]
    #[case("not a url", false)]
    fn origin_policy(#[case] origin: &str, #[case] expected: bool) {
        let cors = Cors::new(["https://farm.example.com/"]);
        assert_eq!(cors.allows(origin), expected);
    }

    #[actix_web::test]
    async fn preflight_short_circuits_with_no_content() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Cors::default())
                .route("/api/fields", web::post().to(|| async { "unreachable" })),
        )
        .await;
        let req = actix_test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/fields")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:5173"))
        );
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            Some(&HeaderValue::from_static("true"))
        );
    }

    #[actix_web::test]
    async fn foreign_origins_are_not_reflected() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Cors::default())
                .route("/", web::get().to(|| async { "ok" })),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    }
}
