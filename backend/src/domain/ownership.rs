//! Ownership checks shared by the farm services.
//!
//! A missing resource is `not_found` and another user's resource is
//! `forbidden`. Reads of single fields and zones hide foreign resources
//! behind `not_found` as well.

use std::fmt::Display;

use super::{Error, UserId};

/// How a foreign resource is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Foreign {
    /// Report as `forbidden`.
    Forbid,
    /// Report as `not_found`.
    Hide,
}

pub(crate) fn missing(kind: &str, id: impl Display) -> Error {
    Error::not_found(format!("{kind} {id} not found"))
}

/// Resolve an optional lookup into an owned resource.
pub(crate) fn owned<T>(
    found: Option<T>,
    owner_of: impl FnOnce(&T) -> UserId,
    caller: UserId,
    kind: &str,
    id: impl Display,
    foreign: Foreign,
) -> Result<T, Error> {
    let resource = found.ok_or_else(|| missing(kind, &id))?;
    if owner_of(&resource) == caller {
        return Ok(resource);
    }
    Err(match foreign {
        Foreign::Forbid => Error::forbidden(format!("{kind} {id} belongs to another user")),
        Foreign::Hide => missing(kind, id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn user(raw: i32) -> UserId {
        UserId::new(raw).expect("valid id")
    }

    #[rstest]
    #[case(None, Foreign::Forbid, ErrorCode::NotFound)]
    #[case(Some(2), Foreign::Forbid, ErrorCode::Forbidden)]
    #[case(Some(2), Foreign::Hide, ErrorCode::NotFound)]
    fn rejects_missing_and_foreign(
        #[case] owner: Option<i32>,
        #[case] foreign: Foreign,
        #[case] expected: ErrorCode,
    ) {
        let err = owned(owner.map(user), |o| *o, user(1), "field", 9, foreign)
            .expect_err("not owned");
        assert_eq!(err.code(), expected);
    }

    #[rstest]
    fn returns_owned_resource() {
        let found = owned(Some(user(1)), |o| *o, user(1), "zone", 3, Foreign::Forbid);
        assert_eq!(found.ok(), Some(user(1)));
    }
}
