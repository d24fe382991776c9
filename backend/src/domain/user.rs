//! User account model.

use std::fmt;

use serde::Serialize;

use super::UserId;

/// Minimum username length once trimmed.
pub const USERNAME_MIN: usize = 3;
/// Minimum phone number length once trimmed.
pub const PHONE_MIN: usize = 10;

/// Validation errors for account fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Username shorter than [`USERNAME_MIN`].
    #[error("username must be at least {min} characters")]
    UsernameTooShort { min: usize },
    /// Phone number shorter than [`PHONE_MIN`].
    #[error("phone number must be at least {min} characters")]
    PhoneTooShort { min: usize },
    /// Display name blank once trimmed.
    #[error("name must not be empty")]
    EmptyDisplayName,
}

/// Login name, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct Username(String);

impl Username {
    /// Trim and validate a username.
    pub fn new(raw: &str) -> Result<Self, UserValidationError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < USERNAME_MIN {
            return Err(UserValidationError::UsernameTooShort { min: USERNAME_MIN });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

/// Contact phone number, trimmed. Stored as text; only the length is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Trim and validate a phone number.
    pub fn new(raw: &str) -> Result<Self, UserValidationError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < PHONE_MIN {
            return Err(UserValidationError::PhoneTooShort { min: PHONE_MIN });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

/// Human readable name shown in the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    pub fn new(raw: &str) -> Result<Self, UserValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

macro_rules! string_newtype_impls {
    ($($name:ident),*) => {
        $(
            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    self.0.as_str()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_ref())
                }
            }

            impl From<$name> for String {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        )*
    };
}

string_newtype_impls!(Username, PhoneNumber, DisplayName);

/// Registered account as exposed to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Username,
    phone: PhoneNumber,
    display_name: DisplayName,
}

impl User {
    /// Assemble a user from validated parts.
    pub fn new(
        id: UserId,
        username: Username,
        phone: PhoneNumber,
        display_name: DisplayName,
    ) -> Self {
        Self {
            id,
            username,
            phone,
            display_name,
        }
    }

    /// Account identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Login name.
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
}
