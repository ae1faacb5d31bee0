//! Input validation errors shared by the domain models.

use crate::model::identity::Identity;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected operation argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace-only.
    Blank(&'static str),
    /// Field must be strictly positive.
    Zero(&'static str),
    /// Field exceeds its maximum length or count.
    TooLong { field: &'static str, max: usize },
    /// Collection must contain at least one element.
    Empty(&'static str),
    /// Collection element appears more than once.
    Duplicate { field: &'static str, index: usize },
    /// Timestamp must lie strictly after the current substrate time.
    NotInFuture(&'static str),
    /// Arithmetic on the field would overflow.
    Overflow(&'static str),
    /// Identity names a contract custody account.
    Reserved(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "`{field}` must not be blank"),
            Self::Zero(field) => write!(f, "`{field}` must be greater than zero"),
            Self::TooLong { field, max } => write!(f, "`{field}` exceeds maximum of {max}"),
            Self::Empty(field) => write!(f, "`{field}` must not be empty"),
            Self::Duplicate { field, index } => {
                write!(f, "`{field}` contains a duplicate at index {index}")
            }
            Self::NotInFuture(field) => write!(f, "`{field}` must be in the future"),
            Self::Overflow(field) => write!(f, "`{field}` overflows"),
            Self::Reserved(field) => write!(f, "`{field}` uses a reserved contract identity"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    require_max_chars(field, value, max_chars)
}

pub(crate) fn require_max_chars(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max_chars {
        return Err(ValidationError::TooLong {
            field,
            max: max_chars,
        });
    }
    Ok(())
}

/// Rejects custody identities where an external account is expected.
pub(crate) fn require_external(
    field: &'static str,
    identity: &Identity,
) -> Result<(), ValidationError> {
    if identity.is_custody() {
        return Err(ValidationError::Reserved(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_external, require_text, ValidationError};
    use crate::model::identity::Identity;

    #[test]
    fn require_text_rejects_blank_and_long_values() {
        assert_eq!(
            require_text("name", "   ", 10),
            Err(ValidationError::Blank("name"))
        );
        assert_eq!(
            require_text("name", "abcdefghijk", 10),
            Err(ValidationError::TooLong {
                field: "name",
                max: 10
            })
        );
        assert!(require_text("name", "ok", 10).is_ok());
    }

    #[test]
    fn require_external_rejects_custody_accounts() {
        let custody = Identity::parse("contract:event_registry").unwrap();
        assert_eq!(
            require_external("caller", &custody),
            Err(ValidationError::Reserved("caller"))
        );
        assert!(require_external("caller", &Identity::parse("alice").unwrap()).is_ok());
    }
}
