//! core::naming
//!
//! Element naming rules and qualified names.
//!
//! # Rules
//!
//! - Names cannot be empty
//! - Names cannot start or end with whitespace
//! - Names cannot contain the path separator `::`
//! - Names cannot contain control characters

use crate::core::error::{MetaError, MetaResult};

/// Separator between package and class names in qualified names.
pub const PATH_SEPARATOR: &str = "::";

/// Validate an element name.
///
/// # Example
///
/// ```
/// use schemata::core::naming::validate_name;
///
/// assert!(validate_name("Animal").is_ok());
/// assert!(validate_name("first name").is_ok());
/// assert!(validate_name("").is_err());
/// assert!(validate_name("zoo::Animal").is_err());
/// ```
pub fn validate_name(name: &str) -> MetaResult<()> {
    if name.is_empty() {
        return Err(MetaError::InvalidName("name cannot be empty".into()));
    }
    if name.trim() != name {
        return Err(MetaError::InvalidName(format!(
            "name '{name}' cannot start or end with whitespace"
        )));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(MetaError::InvalidName(format!(
            "name '{name}' cannot contain '{PATH_SEPARATOR}'"
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(MetaError::InvalidName(
            "name cannot contain control characters".into(),
        ));
    }
    Ok(())
}

/// Join path segments into a qualified name.
///
/// # Example
///
/// ```
/// use schemata::core::naming::qualify;
///
/// assert_eq!(qualify(&["zoo", "mammals"], "Dog"), "zoo::mammals::Dog");
/// assert_eq!(qualify::<&str>(&[], "Dog"), "Dog");
/// ```
pub fn qualify<S: AsRef<str>>(path: &[S], name: &str) -> String {
    let mut out = String::new();
    for segment in path {
        out.push_str(segment.as_ref());
        out.push_str(PATH_SEPARATOR);
    }
    out.push_str(name);
    out
}
