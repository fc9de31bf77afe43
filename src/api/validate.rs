//! Field-level input checks shared by the handlers. Errors are collected per
//! field and reported together as one 400.

use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::password::{self, POLICY_MESSAGE};
use crate::auth::validation::{is_valid_email, normalize_email};
use crate::error::ApiError;

pub const REQUIRED: &str = "This field is required";

#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

/// Trimmed value, with blank strings treated as absent
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an id taken from the path; a malformed id cannot name a row, so it is a 404
pub fn path_uuid(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(not_found))
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The trimmed value, or "" after recording a required-field error
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> &'a str {
        match present(value) {
            Some(v) => v,
            None => {
                self.add(field, REQUIRED);
                ""
            }
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, format!("Must be at most {} characters", max));
            }
        }
    }

    /// Required, well-formed email; returned lower-cased
    pub fn email(&mut self, field: &str, value: Option<&str>) -> String {
        let email = self.required(field, value);
        if !email.is_empty() && !is_valid_email(email) {
            self.add(field, "Invalid email format");
        }
        normalize_email(email)
    }

    /// Required password meeting the policy
    pub fn password<'a>(&mut self, field: &str, value: Option<&'a str>) -> &'a str {
        let pw = value.unwrap_or_default();
        if pw.is_empty() {
            self.add(field, REQUIRED);
        } else if password::validate_strength(pw).is_err() {
            self.add(field, POLICY_MESSAGE);
        }
        pw
    }

    /// Optional UUID; blank means absent
    pub fn uuid(&mut self, field: &str, value: Option<&str>) -> Option<Uuid> {
        let raw = present(value)?;
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                self.add(field, "Must be a UUID");
                None
            }
        }
    }

    /// Optional `YYYY-MM-DD` date; blank means absent
    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let raw = present(value)?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.add(field, "Must be a date (YYYY-MM-DD)");
                None
            }
        }
    }

    /// Optional value restricted to `allowed`
    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) {
        if let Some(v) = value {
            if !allowed.contains(&v) {
                self.add(field, format!("Must be one of: {}", allowed.join(", ")));
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        match self.0.len() {
            0 => Ok(()),
            1 => {
                let (field, message) = self.0.into_iter().next().unwrap_or_default();
                Err(ApiError::field_error(field, message))
            }
            _ => Err(ApiError::validation_error("Validation failed", Some(self.0))),
        }
    }
}
