//! The normalized category label shared by transactions and budget limits.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::validation::{Field, ValidationError};

/// The max number of characters allowed in a category name.
pub const MAX_CATEGORY_LENGTH: usize = 100;

/// A validated, normalized category name, e.g. "groceries".
///
/// Normalization trims the name, collapses runs of whitespace into a single
/// space and lower-cases it, so "  Eating   Out" and "eating out" refer to the
/// same budget. The same rule is applied when transactions are written and
/// when limits are looked up.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// Returns a [ValidationError] for [Field::Category] if `name` is blank or
    /// longer than [MAX_CATEGORY_LENGTH] characters once normalized.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let normalized = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        if normalized.is_empty() {
            return Err(ValidationError::new(
                Field::Category,
                "Category is required",
            ));
        }

        if normalized.chars().count() > MAX_CATEGORY_LENGTH {
            return Err(ValidationError::new(
                Field::Category,
                "Category cannot exceed 100 characters",
            ));
        }

        Ok(Self(normalized))
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is already normalized, e.g.
    /// because it was read back from the database.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the invariant
    /// is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        category::CategoryName,
        validation::{Field, ValidationError},
    };

    #[test]
    fn normalizes_case_and_whitespace() {
        let name = CategoryName::new("  Eating \t  Out ").unwrap();

        assert_eq!(name.as_ref(), "eating out");
        assert_eq!(name, CategoryName::new("eating out").unwrap());
    }

    #[test]
    fn rejects_blank_name() {
        let result = CategoryName::new("   ");

        assert_eq!(
            result,
            Err(ValidationError::new(Field::Category, "Category is required"))
        );
    }

    #[test]
    fn accepts_100_characters() {
        let name = "é".repeat(100);

        assert!(CategoryName::new(&name).is_ok());
    }

    #[test]
    fn rejects_101_characters() {
        let name = "a".repeat(101);

        let result = CategoryName::new(&name);

        assert!(matches!(
            result,
            Err(ValidationError {
                field: Field::Category,
                ..
            })
        ));
    }
}
