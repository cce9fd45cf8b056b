//! Explicit input validation for request DTOs.
//!
//! Handlers call `validate()` on a DTO before it reaches a service. Rules are
//! collected with a [`Validator`], which records every violation instead of
//! stopping at the first one.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{CatalogError, CatalogResult, Violation};

/// Maximum length of name-like fields.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of free-text descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

/// Something that can check its own fields.
pub trait Validate {
    fn validate(&self) -> CatalogResult<()>;
}

/// Accumulates violations for a single request.
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation unconditionally.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.violations.push(Violation::new(field, message));
        self
    }

    pub fn not_blank(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.reject(field, "must not be blank");
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.reject(field, format!("length must not exceed {}", max));
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: f64) -> &mut Self {
        if !(value.is_finite() && value > 0.0) {
            self.reject(field, "must be positive");
        }
        self
    }

    /// Check that a `[start, end]` pair is ordered. The violation is reported
    /// against `end_field`.
    pub fn date_order(
        &mut self,
        start_field: &str,
        start: NaiveDate,
        end_field: &str,
        end: NaiveDate,
    ) -> &mut Self {
        if start > end {
            self.reject(
                end_field,
                format!("must not be earlier than {}", start_field),
            );
        }
        self
    }

    /// Email format check. Blank values are left to `not_blank`.
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && !email_pattern().is_match(value) {
            self.reject(field, "must be a well-formed email address");
        }
        self
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Finish validation, turning any recorded violations into an error.
    pub fn finish(&mut self) -> CatalogResult<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::violations(std::mem::take(&mut self.violations)))
        }
    }
}

/// Validate an audit period query.
pub fn validate_period(from: NaiveDate, to: NaiveDate) -> CatalogResult<()> {
    if from > to {
        return Err(CatalogError::Validation {
            message: format!("fromDate {} is after toDate {}", from, to),
            violations: vec![Violation::new("fromDate", "must not be after toDate")],
        });
    }
    Ok(())
}
