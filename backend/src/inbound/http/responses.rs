//! Response envelopes shared by the collection endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// `{"data": [...], "count": n}` wrapper for unpaged lists.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListResponse<T> {
    /// Wrap already converted rows.
    pub fn new(data: Vec<T>) -> Self {
        let count = data.len();
        Self { data, count }
    }

    /// Convert domain rows and wrap them.
    pub fn from_rows<S>(rows: impl IntoIterator<Item = S>) -> Self
    where
        T: From<S>,
    {
        Self::new(rows.into_iter().map(T::from).collect())
    }
}

impl<T> FromIterator<T> for ListResponse<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
