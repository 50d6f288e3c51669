//! Typed result of a backend lookup.

use super::error::{BackendError, BackendResult};

/// A lookup either finds something, finds nothing, or fails.
#[derive(Debug)]
pub enum BackendResponse<T> {
    /// The row exists.
    Found(T),
    /// The query ran and matched nothing.
    NotFound,
    /// The query could not be run.
    Error(BackendError),
}

impl<T> From<BackendResult<Option<T>>> for BackendResponse<T> {
    fn from(result: BackendResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Self::Found(value),
            Ok(None) => Self::NotFound,
            Err(e) => Self::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result_cases() {
        let found: BackendResponse<u8> = Ok(Some(1)).into();
        assert!(matches!(found, BackendResponse::Found(1)));

        let missing: BackendResponse<u8> = Ok(None).into();
        assert!(matches!(missing, BackendResponse::NotFound));

        let failed: BackendResponse<u8> = Err(BackendError::Status(500)).into();
        assert!(matches!(failed, BackendResponse::Error(BackendError::Status(500))));
    }
}
