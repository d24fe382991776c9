//! Driving ports for login and sign-up use-cases.
//!
//! Inbound adapters call these to authenticate or register accounts without
//! knowing the backing infrastructure, so handler tests can substitute a
//! double instead of wiring persistence.

use async_trait::async_trait;

use crate::domain::{
    DisplayName, Error, LoginCredentials, PhoneNumber, Registration, User, UserId, Username,
};

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the authenticated account.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error>;
}

/// Domain use-case port for creating accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationService: Send + Sync {
    /// Store a validated registration and return the new account.
    async fn register(&self, registration: &Registration) -> Result<User, Error>;
}

/// Account served by the fixture ports.
pub fn fixture_user() -> Result<User, Error> {
    let build = || -> Result<User, String> {
        let id = UserId::new(1).map_err(|err| err.to_string())?;
        let username = Username::new("admin").map_err(|err| err.to_string())?;
        let phone = PhoneNumber::new("0800000000").map_err(|err| err.to_string())?;
        let name = DisplayName::new("Demo Farmer").map_err(|err| err.to_string())?;
        Ok(User::new(id, username, phone, name))
    };
    build().map_err(|err| Error::internal(format!("invalid fixture user: {err}")))
}

/// In-memory authenticator used when no database is configured.
///
/// `admin` / `password` authenticates successfully as user `1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoginService;

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        if credentials.username() == "admin" && credentials.password() == "password" {
            fixture_user()
        } else {
            Err(invalid_credentials())
        }
    }
}

/// Registration port that refuses sign-ups while persistence is absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureRegistrationService;

#[async_trait]
impl RegistrationService for FixtureRegistrationService {
    async fn register(&self, _registration: &Registration) -> Result<User, Error> {
        Err(Error::service_unavailable(
            "registration requires a configured database",
        ))
    }
}

/// Error returned for unknown users and wrong passwords alike.
pub fn invalid_credentials() -> Error {
    Error::unauthorized("invalid credentials")
        .with_details(serde_json::json!({ "code": "invalid_credentials" }))
}
