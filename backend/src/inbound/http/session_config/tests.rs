//! Unit tests for session configuration parsing.

use super::*;
use mockable::MockEnv;
use rstest::{fixture, rstest};
use std::collections::HashMap;
use std::io::Write as _;
use tempfile::NamedTempFile;

fn key_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temporary key file");
    file.write_all(&vec![b'k'; len]).expect("write key bytes");
    file
}

fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

#[fixture]
fn full_key() -> NamedTempFile {
    key_file(SESSION_KEY_MIN_LEN)
}

fn release_vars(key: &NamedTempFile) -> HashMap<&'static str, String> {
    HashMap::from([
        (KEY_FILE_ENV, path_of(key)),
        (COOKIE_SECURE_ENV, "1".to_owned()),
        (SAMESITE_ENV, "Strict".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "0".to_owned()),
    ])
}

fn release_error(vars: HashMap<&'static str, String>) -> SessionConfigError {
    match session_settings_from_env(&mock_env(vars), BuildMode::Release) {
        Ok(_) => panic!("release settings should be rejected"),
        Err(error) => error,
    }
}

#[rstest]
fn release_valid_settings_succeed(full_key: NamedTempFile) {
    let settings = session_settings_from_env(&mock_env(release_vars(&full_key)), BuildMode::Release)
        .expect("valid release settings");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
}

#[rstest]
#[case(COOKIE_SECURE_ENV)]
#[case(SAMESITE_ENV)]
#[case(ALLOW_EPHEMERAL_ENV)]
fn release_missing_toggle_is_rejected(full_key: NamedTempFile, #[case] name: &'static str) {
    let mut vars = release_vars(&full_key);
    vars.remove(name);
    let err = release_error(vars);
    assert!(
        matches!(err, SessionConfigError::MissingEnv { name: missing } if missing == name),
        "unexpected error: {err}"
    );
}

#[rstest]
#[case("maybe")]
#[case("")]
fn release_invalid_cookie_secure_is_rejected(full_key: NamedTempFile, #[case] value: &str) {
    let mut vars = release_vars(&full_key);
    vars.insert(COOKIE_SECURE_ENV, value.to_owned());
    let err = release_error(vars);
    assert!(matches!(
        err,
        SessionConfigError::InvalidEnv {
            name: COOKIE_SECURE_ENV,
            ..
        }
    ));
}

#[rstest]
fn release_ephemeral_enabled_is_rejected(full_key: NamedTempFile) {
    let mut vars = release_vars(&full_key);
    vars.insert(ALLOW_EPHEMERAL_ENV, "yes".to_owned());
    assert!(matches!(release_error(vars), SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_unreadable_key_is_rejected(full_key: NamedTempFile) {
    let mut vars = release_vars(&full_key);
    vars.insert(KEY_FILE_ENV, "/definitely/not/here/session_key".to_owned());
    assert!(matches!(release_error(vars), SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn release_short_key_is_rejected() {
    let short = key_file(SESSION_KEY_MIN_LEN - 1);
    let err = release_error(release_vars(&short));
    assert!(matches!(
        err,
        SessionConfigError::KeyTooShort { length, .. } if length == SESSION_KEY_MIN_LEN - 1
    ));
}

#[rstest]
fn release_insecure_none_same_site_is_rejected(full_key: NamedTempFile) {
    let mut vars = release_vars(&full_key);
    vars.insert(COOKIE_SECURE_ENV, "0".to_owned());
    vars.insert(SAMESITE_ENV, "None".to_owned());
    assert!(matches!(release_error(vars), SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn debug_defaults_allow_ephemeral_key() {
    let mut vars = HashMap::new();
    vars.insert(KEY_FILE_ENV, "/definitely/not/here/session_key".to_owned());
    let settings = session_settings_from_env(&mock_env(vars), BuildMode::Debug)
        .expect("debug defaults should succeed");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
#[case("unexpected", SameSite::Lax)]
#[case("lax", SameSite::Lax)]
#[case("STRICT", SameSite::Strict)]
#[case("None", SameSite::None)]
fn debug_same_site_parsing(
    full_key: NamedTempFile,
    #[case] value: &str,
    #[case] expected: SameSite,
) {
    let mut vars = release_vars(&full_key);
    vars.insert(SAMESITE_ENV, value.to_owned());
    let settings = session_settings_from_env(&mock_env(vars), BuildMode::Debug)
        .expect("debug parsing succeeds");
    assert_eq!(settings.same_site, expected);
}

#[rstest]
fn same_key_file_derives_the_same_key(full_key: NamedTempFile) {
    let first = session_settings_from_env(&mock_env(release_vars(&full_key)), BuildMode::Release)
        .expect("first load");
    let second = session_settings_from_env(&mock_env(release_vars(&full_key)), BuildMode::Release)
        .expect("second load");
    assert_eq!(
        fingerprint::key_fingerprint(&first.key),
        fingerprint::key_fingerprint(&second.key)
    );
}
