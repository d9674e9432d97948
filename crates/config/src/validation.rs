//! Validation system for configuration values
//!
//! This module provides traits and utilities for validating configuration values.
//! Each config section implements the `ConfigSection` trait which includes validation.

pub use crate::error::ValidationError;

/// Trait for configuration sections that can validate themselves
///
/// Each config section (AppConfig, ProcessingConfig, etc.) implements this trait
/// to provide validation logic. This allows the system to be extended with
/// new config sections without modifying existing code.
pub trait ConfigSection: Default {
    /// Validates the configuration section
    ///
    /// Returns a list of validation errors. Empty list means valid.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges another config section into this one
    ///
    /// Values from `other` take precedence. This is used for override chains.
    fn merge(&mut self, other: Self);

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a value is one of the allowed options
    pub fn one_of<T>(value: &T, allowed: &[T], field: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + std::fmt::Display,
    {
        if !allowed.contains(value) {
            let allowed_str = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ValidationError::with_value(
                field,
                format!("must be one of: {}", allowed_str),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that every `{token}` in a naming template is known
    ///
    /// Unbalanced braces are reported as well, since they would leak into
    /// folder names.
    pub fn template_tokens(
        template: &str,
        allowed: &[&str],
        field: &str,
    ) -> Result<(), ValidationError> {
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if rest[..open].contains('}') {
                break;
            }
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(ValidationError::with_value(
                    field,
                    "has an unclosed '{'",
                    template,
                ));
            };
            let token = &after[..close];
            if !allowed.contains(&token) {
                return Err(ValidationError::with_value(
                    field,
                    format!("unknown token {{{}}}, expected one of: {}", token, allowed.join(", ")),
                    template,
                ));
            }
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(ValidationError::with_value(
                field,
                "has an unmatched '}'",
                template,
            ));
        }
        Ok(())
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
