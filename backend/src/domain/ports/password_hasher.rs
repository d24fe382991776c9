//! Driven port for password hashing.

use super::define_port_error;

define_port_error! {
    /// Errors raised by password hashing adapters.
    pub enum PasswordHashError {
        /// Hashing failed.
        Hash { message: String } => "password hashing failed: {message}",
        /// A stored hash could not be parsed.
        MalformedHash { message: String } => "stored password hash is malformed: {message}",
    }
}

/// Hashes and verifies passwords. Implementations are CPU bound and
/// synchronous.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Produce a PHC string for `password`.
    fn hash(&self, password: &str) -> Result<String, PasswordHashError>;

    /// Check `password` against a stored PHC string.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordHashError>;
}
