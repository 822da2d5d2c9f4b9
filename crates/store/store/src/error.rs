use thiserror::Error;

/// Canonical errors surfaced by every store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity family, e.g. `"routing rule"`.
        entity: &'static str,
        /// The id or alternate key that missed.
        id: String,
    },

    /// The request was structurally invalid (missing field, bad page
    /// token, malformed value).
    #[error("invalid {0}")]
    Invalid(String),

    /// A unique constraint was violated.
    #[error("duplicate {field}: {value}")]
    Duplicate {
        /// The unique field, e.g. `"priority"`, `"asn"`.
        field: &'static str,
        value: String,
    },

    /// The backend failed.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The operation is not implemented by this backend.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
}

impl StoreError {
    /// Shorthand for a [`StoreError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`StoreError::Duplicate`].
    #[must_use]
    pub fn duplicate(field: &'static str, value: impl ToString) -> Self {
        Self::Duplicate {
            field,
            value: value.to_string(),
        }
    }

    /// Whether this error is the not-found sentinel. Resolvers use this
    /// to distinguish "keep trying" from "log and continue".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_detection() {
        assert!(StoreError::not_found("customer", "c-1").is_not_found());
        assert!(!StoreError::Invalid("page token".into()).is_not_found());
        assert!(!StoreError::duplicate("asn", 64512).is_not_found());
    }

    #[test]
    fn display_messages() {
        let err = StoreError::not_found("site", "s-9");
        assert_eq!(err.to_string(), "site not found: s-9");
        let err = StoreError::duplicate("priority", 5);
        assert_eq!(err.to_string(), "duplicate priority: 5");
    }
}
