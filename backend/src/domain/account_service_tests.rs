//! Tests for the account service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::ports::{MockPasswordHasher, MockUserRepository, StoredUser};
use crate::domain::{DisplayName, ErrorCode, PhoneNumber, RegistrationParts, Username};

fn sample_user() -> User {
    User::new(
        UserId::new(7).expect("valid id"),
        Username::new("somchai").expect("valid username"),
        PhoneNumber::new("0812345678").expect("valid phone"),
        DisplayName::new("Somchai").expect("valid name"),
    )
}

fn stored() -> StoredUser {
    StoredUser {
        user: sample_user(),
        password_hash: "$argon2id$stub".to_owned(),
    }
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts("somchai", password).expect("credentials shape")
}

fn registration() -> Registration {
    Registration::try_from_parts(RegistrationParts {
        username: Some("somchai"),
        phone: Some("0812345678"),
        password: Some("secret1"),
        confirm_password: Some("secret1"),
        name: Some("Somchai"),
    })
    .expect("valid registration")
}

#[rstest]
#[tokio::test]
async fn authenticate_returns_user_when_password_matches() {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_username()
        .withf(|name| name == "somchai")
        .return_once(|_| Ok(Some(stored())));
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_verify()
        .withf(|password, hash| password == "secret1" && hash == "$argon2id$stub")
        .return_once(|_, _| Ok(true));

    let service = AccountService::new(Arc::new(users), Arc::new(hasher));
    let user = service
        .authenticate(&credentials("secret1"))
        .await
        .expect("login succeeds");
    assert_eq!(user, sample_user());
}

#[rstest]
#[case(true)]
#[case(false)]
#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same(#[case] user_exists: bool) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_username()
        .return_once(move |_| Ok(user_exists.then(stored)));
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_verify()
        .times(usize::from(user_exists))
        .returning(|_, _| Ok(false));

    let service = AccountService::new(Arc::new(users), Arc::new(hasher));
    let err = service
        .authenticate(&credentials("wrong1"))
        .await
        .expect_err("login fails");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(
        err.details(),
        Some(&serde_json::json!({ "code": "invalid_credentials" }))
    );
}

#[rstest]
#[tokio::test]
async fn register_stores_hash_not_password() {
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .withf(|password| password == "secret1")
        .return_once(|_| Ok("$argon2id$hashed".to_owned()));
    let mut users = MockUserRepository::new();
    users
        .expect_create()
        .withf(|record| {
            record.password_hash == "$argon2id$hashed" && record.username.as_ref() == "somchai"
        })
        .return_once(|_| Ok(sample_user()));

    let service = AccountService::new(Arc::new(users), Arc::new(hasher));
    let user = service.register(&registration()).await.expect("registered");
    assert_eq!(user.id().get(), 7);
}

#[rstest]
#[tokio::test]
async fn register_maps_duplicates_to_conflict() {
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .return_once(|_| Ok("$argon2id$hashed".to_owned()));
    let mut users = MockUserRepository::new();
    users
        .expect_create()
        .return_once(|_| Err(UserPersistenceError::duplicate("users_username_key")));

    let service = AccountService::new(Arc::new(users), Arc::new(hasher));
    let err = service
        .register(&registration())
        .await
        .expect_err("duplicate user");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.details(), Some(&serde_json::json!({ "code": "user_exists" })));
}

#[rstest]
#[case(UserPersistenceError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn fetch_user_maps_repository_errors(
    #[case] failure: UserPersistenceError,
    #[case] expected: ErrorCode,
) {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().return_once(move |_| Err(failure));

    let service = AccountService::new(Arc::new(users), Arc::new(MockPasswordHasher::new()));
    let err = service
        .fetch_user(UserId::new(7).expect("valid id"))
        .await
        .expect_err("repository failure");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn fetch_user_rejects_deleted_accounts() {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().return_once(|_| Ok(None));

    let service = AccountService::new(Arc::new(users), Arc::new(MockPasswordHasher::new()));
    let err = service
        .fetch_user(UserId::new(7).expect("valid id"))
        .await
        .expect_err("deleted user");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

/// Reversible hasher so a test can register and then log in.
struct PrefixHasher;

impl PasswordHasher for PrefixHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordHashError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordHashError> {
        Ok(hash == format!("plain${password}"))
    }
}

#[rstest]
#[tokio::test]
async fn padded_password_registers_and_logs_in() {
    let stored_hash = Arc::new(std::sync::Mutex::new(None::<String>));
    let mut users = MockUserRepository::new();
    let captured = Arc::clone(&stored_hash);
    users.expect_create().return_once(move |record| {
        *captured.lock().expect("hash slot") = Some(record.password_hash.clone());
        Ok(sample_user())
    });
    let lookup = Arc::clone(&stored_hash);
    users.expect_find_by_username().return_once(move |_| {
        let password_hash = lookup.lock().expect("hash slot").clone().expect("registered hash");
        Ok(Some(StoredUser {
            user: sample_user(),
            password_hash,
        }))
    });

    let service = AccountService::new(Arc::new(users), Arc::new(PrefixHasher));
    let registration = Registration::try_from_parts(RegistrationParts {
        username: Some("somchai"),
        phone: Some("0812345678"),
        password: Some(" secret1 "),
        confirm_password: Some(" secret1 "),
        name: Some("Somchai"),
    })
    .expect("valid registration");
    service.register(&registration).await.expect("registered");

    let user = service
        .authenticate(&credentials(" secret1 "))
        .await
        .expect("the password typed at sign-up logs in");
    assert_eq!(user, sample_user());
}
