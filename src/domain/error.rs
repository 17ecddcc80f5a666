use thiserror::Error;

/// A field-level rule violated by an admin write.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("`{field}` {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }
}
