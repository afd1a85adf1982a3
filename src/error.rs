use thiserror::Error;

/// Errors returned by store operations. Persistence failures are not part of
/// this set: they are logged and never reach the caller.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum StoreError {
    #[error("Method parameter should not be empty")]
    EmptyParameter,
    #[error("Value must contain `id` field")]
    IdNotFound,
    #[error("Value `id` mismatched existing `id`")]
    MismatchId,
    #[error("Resource with that key was not found")]
    ResourceNotFound,
    #[error("Requested field was not found in data")]
    FieldNotFound,
    #[error("Filter item must use `{{\"field\": <field name>, \"value\": <field value>}}` format")]
    InvalidFilterFormat,
}

impl StoreError {
    /// HTTP status an embedding network layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::EmptyParameter
            | StoreError::IdNotFound
            | StoreError::MismatchId
            | StoreError::InvalidFilterFormat => 400,
            StoreError::ResourceNotFound => 404,
            StoreError::FieldNotFound => 500,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn status_codes() {
        assert_eq!(StoreError::EmptyParameter.status_code(), 400);
        assert_eq!(StoreError::MismatchId.status_code(), 400);
        assert_eq!(StoreError::ResourceNotFound.status_code(), 404);
        assert_eq!(StoreError::FieldNotFound.status_code(), 500);
    }

    #[test]
    fn messages() {
        assert_eq!(
            StoreError::IdNotFound.to_string(),
            "Value must contain `id` field"
        );
        assert!(StoreError::InvalidFilterFormat
            .to_string()
            .contains("{\"field\": <field name>"));
    }
}
