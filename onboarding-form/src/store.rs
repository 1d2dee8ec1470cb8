//! Form state: values, per-field errors and touched fields
//!
//! All mutation goes through the store's operations. Errors are re-derived
//! from the rule (or remote answer) that produced them rather than
//! accumulated, so a message never outlives the value it was computed for.

use tracing::debug;

use crate::corporation::CheckOutcome;
use crate::types::{Field, FormData, TouchedSet, ValidationErrors};
use crate::validation::{is_lookup_candidate, validate_field, CORPORATION_NUMBER_LEN, NAME_MAX_LEN};

/// What the caller must do after a blur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlurEffect {
    None,
    /// The corporation number passed its length rule; confirm it remotely
    CheckCorporation(String),
}

/// Longest value the input widget for `field` accepts, in characters
fn input_limit(field: Field) -> Option<usize> {
    match field {
        Field::FirstName | Field::LastName => Some(NAME_MAX_LEN),
        Field::CorporationNumber => Some(CORPORATION_NUMBER_LEN),
        Field::Phone => None,
    }
}

fn truncate_chars(value: &mut String, limit: usize) {
    if let Some((cut, _)) = value.char_indices().nth(limit) {
        value.truncate(cut);
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormStore {
    data: FormData,
    errors: ValidationErrors,
    touched: TouchedSet,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn value(&self, field: Field) -> &str {
        self.data.get(field)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn touched(&self) -> &TouchedSet {
        &self.touched
    }

    /// Overwrite a value. Any error on the field is dropped immediately,
    /// before the new value has been validated.
    ///
    /// Names and the corporation number are cut to their input limits.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        let mut value = value.into();
        if let Some(limit) = input_limit(field) {
            truncate_chars(&mut value, limit);
        }
        self.data.set(field, value);
        self.errors.clear(field);
    }

    /// Mark `field` touched and run its format rule.
    ///
    /// For the corporation number a passing length rule does not settle the
    /// error: the remote answer for the current value decides it, so the
    /// existing entry is left to `apply_remote`.
    pub fn blur(&mut self, field: Field) -> BlurEffect {
        self.touched.insert(field);

        let value = self.data.get(field);
        match validate_field(field, value) {
            Err(message) => {
                self.errors.set(field, message);
                BlurEffect::None
            }
            Ok(()) if field == Field::CorporationNumber => BlurEffect::CheckCorporation(value.to_string()),
            Ok(()) => {
                self.errors.clear(field);
                BlurEffect::None
            }
        }
    }

    /// Apply a remote answer computed for `key`.
    ///
    /// Ignored unless `key` is still the current corporation number, the
    /// field has been touched, and the value has the lookup length. Returns
    /// whether the error state was updated.
    pub fn apply_remote(&mut self, key: &str, outcome: &CheckOutcome) -> bool {
        let current = self.data.get(Field::CorporationNumber);
        if current != key {
            debug!("Dropping stale corporation answer for {} (current value {})", key, current);
            return false;
        }
        if !self.touched.contains(Field::CorporationNumber) || !is_lookup_candidate(current) {
            return false;
        }

        match outcome.error_message() {
            Some(message) => self.errors.set(Field::CorporationNumber, message),
            None => {
                self.errors.clear(Field::CorporationNumber);
            }
        }
        true
    }

    pub fn replace_errors(&mut self, errors: ValidationErrors) {
        self.errors = errors;
    }

    /// Back to the freshly mounted state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
