//! Synchronous format rules for each field

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Field, FormData, ValidationErrors};

pub const NAME_MAX_LEN: usize = 50;
pub const CORPORATION_NUMBER_LEN: usize = 9;

pub const PHONE_FORMAT_MESSAGE: &str =
    "Invalid Canadian phone number. Must start with +1 followed by 10 digits";
pub const CORPORATION_LENGTH_MESSAGE: &str = "Corporation number must be exactly 9 characters";

lazy_static! {
    static ref CANADIAN_PHONE: Regex = Regex::new(r"^\+1[0-9]{10}$").expect("phone pattern is valid");
}

/// Character count, not byte length
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// True when `value` has the exact length the remote lookup accepts
pub fn is_lookup_candidate(value: &str) -> bool {
    char_len(value) == CORPORATION_NUMBER_LEN
}

fn validate_name(field: Field, value: &str) -> Result<(), String> {
    let len = char_len(value);
    if len == 0 {
        return Err(format!("{} is required", field.label()));
    }
    if len > NAME_MAX_LEN {
        return Err(format!("{} must be {} characters or less", field.label(), NAME_MAX_LEN));
    }
    Ok(())
}

/// Check one field, returning the first failing rule's message.
///
/// An empty phone number fails with the format message; there is no
/// separate "required" message for it.
pub fn validate_field(field: Field, value: &str) -> Result<(), String> {
    match field {
        Field::FirstName | Field::LastName => validate_name(field, value),
        Field::Phone => {
            if CANADIAN_PHONE.is_match(value) {
                Ok(())
            } else {
                Err(PHONE_FORMAT_MESSAGE.to_string())
            }
        }
        Field::CorporationNumber => {
            if is_lookup_candidate(value) {
                Ok(())
            } else {
                Err(CORPORATION_LENGTH_MESSAGE.to_string())
            }
        }
    }
}

/// Check every field independently and collect one message per failing field
pub fn validate_form(data: &FormData) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for field in Field::ALL {
        if let Err(message) = validate_field(field, data.get(field)) {
            errors.set(field, message);
        }
    }
    errors
}
