//! Authentication primitives: login credentials and account registration.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.

use std::fmt;

use zeroize::Zeroizing;

use super::{DisplayName, PhoneNumber, UserValidationError, Username};

/// Minimum password length accepted at registration.
pub const PASSWORD_MIN: usize = 6;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Username was missing or blank once trimmed.
    EmptyUsername,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials used by authentication services.
///
/// ## Invariants
/// - `username` is trimmed and must not be empty after trimming.
/// - `password` must be non-empty but keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use backend::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" somchai ", "secret1").unwrap();
/// assert_eq!(creds.username(), "somchai");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    username: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw username/password inputs.
    pub fn try_from_parts(username: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalized = username.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyUsername);
        }
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            username: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Username string suitable for user lookups.
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Reasons a registration request is refused before touching storage.
///
/// Checks run in declaration order and the first failure wins.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationValidationError {
    /// One of the five fields was absent or blank.
    #[error("all fields are required")]
    MissingFields,
    /// Username shorter than the minimum.
    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },
    /// Phone number shorter than the minimum.
    #[error("phone number must be at least {min} characters")]
    PhoneInvalid { min: usize },
    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,
    /// Password shorter than [`PASSWORD_MIN`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

impl RegistrationValidationError {
    /// Stable code reported to clients in error details.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::UsernameTooShort { .. } => "username_too_short",
            Self::PhoneInvalid { .. } => "phone_invalid",
            Self::PasswordMismatch => "password_mismatch",
            Self::PasswordTooShort { .. } => "password_too_short",
        }
    }
}

/// Raw registration inputs as received from a client.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistrationParts<'a> {
    /// Requested login name.
    pub username: Option<&'a str>,
    /// Contact phone number.
    pub phone: Option<&'a str>,
    /// Chosen password.
    pub password: Option<&'a str>,
    /// Password typed a second time.
    pub confirm_password: Option<&'a str>,
    /// Display name.
    pub name: Option<&'a str>,
}

/// Validated new account, ready to be hashed and stored.
///
/// Text fields are trimmed. The password is kept exactly as typed.
#[derive(Debug, Clone)]
pub struct Registration {
    username: Username,
    phone: PhoneNumber,
    display_name: DisplayName,
    password: Zeroizing<String>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Like [`present`] but hands back the value as typed. Passwords are
/// compared and hashed verbatim so they match what login receives.
fn present_verbatim(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Registration {
    /// Validate raw registration inputs.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{Registration, RegistrationParts};
    ///
    /// let parts = RegistrationParts {
    ///     username: Some("somchai"),
    ///     phone: Some("0812345678"),
    ///     password: Some("secret1"),
    ///     confirm_password: Some("secret1"),
    ///     name: Some("Somchai"),
    /// };
    /// assert!(Registration::try_from_parts(parts).is_ok());
    /// ```
    pub fn try_from_parts(parts: RegistrationParts<'_>) -> Result<Self, RegistrationValidationError> {
        let (Some(username), Some(phone), Some(password), Some(confirm), Some(name)) = (
            present(parts.username),
            present(parts.phone),
            present_verbatim(parts.password),
            present_verbatim(parts.confirm_password),
            present(parts.name),
        ) else {
            return Err(RegistrationValidationError::MissingFields);
        };

        let username = Username::new(username).map_err(|err| match err {
            UserValidationError::UsernameTooShort { min } => {
                RegistrationValidationError::UsernameTooShort { min }
            }
            _ => RegistrationValidationError::MissingFields,
        })?;
        let phone = PhoneNumber::new(phone).map_err(|err| match err {
            UserValidationError::PhoneTooShort { min } => {
                RegistrationValidationError::PhoneInvalid { min }
            }
            _ => RegistrationValidationError::MissingFields,
        })?;
        if password != confirm {
            return Err(RegistrationValidationError::PasswordMismatch);
        }
        if password.chars().count() < PASSWORD_MIN {
            return Err(RegistrationValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        let display_name =
            DisplayName::new(name).map_err(|_| RegistrationValidationError::MissingFields)?;

        Ok(Self {
            username,
            phone,
            display_name,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Requested login name.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Contact phone number.
    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    /// Display name.
    pub fn display_name(&self) -> &DisplayName {
        &self.display_name
    }

    /// Plain password, to be hashed before storage.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rstest_bdd_macros::{given, then, when};

    #[rstest]
    #[case("", "pw", LoginValidationError::EmptyUsername)]
    #[case("   ", "pw", LoginValidationError::EmptyUsername)]
    #[case("user", "", LoginValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] username: &str,
        #[case] password: &str,
        #[case] expected: LoginValidationError,
    ) {
        let err = LoginCredentials::try_from_parts(username, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    fn parts<'a>(
        username: &'a str,
        phone: &'a str,
        password: &'a str,
        confirm: &'a str,
    ) -> RegistrationParts<'a> {
        RegistrationParts {
            username: Some(username),
            phone: Some(phone),
            password: Some(password),
            confirm_password: Some(confirm),
            name: Some("Somchai Farm"),
        }
    }

    #[rstest]
    #[case(parts("", "0812345678", "secret1", "secret1"), "missing_fields")]
    #[case(parts("ab", "0812345678", "secret1", "secret1"), "username_too_short")]
    #[case(parts("somchai", "08123", "secret1", "secret1"), "phone_invalid")]
    #[case(parts("somchai", "0812345678", "secret1", "secret2"), "password_mismatch")]
    #[case(parts("somchai", "0812345678", "abc", "abc"), "password_too_short")]
    // Earlier checks win even when later ones would also fail.
    #[case(parts("ab", "1", "abc", "xyz"), "username_too_short")]
    fn registration_checks_run_in_order(
        #[case] input: RegistrationParts<'static>,
        #[case] expected: &str,
    ) {
        let err = Registration::try_from_parts(input).expect_err("invalid registration");
        assert_eq!(err.code(), expected);
    }

    #[rstest]
    fn missing_name_is_reported_as_missing_fields() {
        let mut input = parts("somchai", "0812345678", "secret1", "secret1");
        input.name = None;
        let err = Registration::try_from_parts(input).expect_err("missing name");
        assert_eq!(err, RegistrationValidationError::MissingFields);
    }

    #[rstest]
    #[case(Some("   "))]
    #[case(None)]
    fn blank_password_is_missing(#[case] password: Option<&'static str>) {
        let mut input = parts("somchai", "0812345678", "secret1", "secret1");
        input.password = password;
        let err = Registration::try_from_parts(input).expect_err("blank password");
        assert_eq!(err, RegistrationValidationError::MissingFields);
    }

    #[rstest]
    fn padded_password_must_match_confirmation_exactly() {
        let err = Registration::try_from_parts(parts("somchai", "0812345678", " secret1 ", "secret1"))
            .expect_err("confirmation differs in whitespace");
        assert_eq!(err, RegistrationValidationError::PasswordMismatch);
    }

    #[given("a farmer filling in the sign-up form with padded values")]
    fn padded_sign_up_form() -> RegistrationParts<'static> {
        RegistrationParts {
            username: Some("  somchai  "),
            phone: Some(" 0812345678 "),
            password: Some(" secret1 "),
            confirm_password: Some(" secret1 "),
            name: Some("  Somchai Farm "),
        }
    }

    #[when("the form is validated")]
    fn the_form_is_validated(
        parts: &RegistrationParts<'static>,
    ) -> Result<Registration, RegistrationValidationError> {
        Registration::try_from_parts(*parts)
    }

    #[then("text fields are trimmed and the password matches a login with the same input")]
    fn password_survives_for_login(result: Result<Registration, RegistrationValidationError>) {
        let registration = result.expect("padded input is valid");
        assert_eq!(registration.username().as_ref(), "somchai");
        assert_eq!(registration.phone().as_ref(), "0812345678");
        assert_eq!(registration.display_name().as_ref(), "Somchai Farm");

        let login = LoginCredentials::try_from_parts("somchai", " secret1 ")
            .expect("login with the typed password");
        assert_eq!(registration.password(), login.password());
    }

    #[rstest]
    fn padded_registration_keeps_password_verbatim() {
        password_survives_for_login(the_form_is_validated(&padded_sign_up_form()));
    }
}
