//! Field-level validation primitives.
//!
//! Validation failures are collected, not short-circuited, so a response can
//! report every bad field at once.

use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Accumulator for field errors.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    /// Record an error unless `value` (trimmed) is at least `min` chars long.
    pub fn require_min_len(
        &mut self,
        field: &'static str,
        value: &str,
        min: usize,
        message: &'static str,
    ) {
        if value.trim().chars().count() < min {
            self.push(field, message);
        }
    }

    /// Record an error unless `value` is `len` ASCII digits.
    pub fn require_digits(
        &mut self,
        field: &'static str,
        value: &str,
        len: usize,
        message: &'static str,
    ) {
        let v = value.trim();
        if v.len() != len || !v.bytes().all(|b| b.is_ascii_digit()) {
            self.push(field, message);
        }
    }

    /// Record an error unless `value` looks like an email address.
    pub fn require_email(&mut self, field: &'static str, value: &str, message: &'static str) {
        let v = value.trim();
        let well_formed = v
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            self.push(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), Vec<FieldError>> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}
