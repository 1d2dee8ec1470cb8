//! Request and response bodies for the onboarding endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST /profile-details`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub corporation_number: String,
}

/// Body of `GET /corporation-number/{number}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorporationValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CorporationValidation {
    pub fn valid(corporation_number: impl Into<String>) -> Self {
        Self {
            valid: true,
            corporation_number: Some(corporation_number.into()),
            message: None,
        }
    }

    pub fn invalid(corporation_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            corporation_number: Some(corporation_number.into()),
            message: Some(message.into()),
        }
    }
}

/// Failure body returned by either endpoint.
///
/// The corporation lookup answers rejections with a full
/// [`CorporationValidation`] body; only its `message` matters here, the
/// remaining keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
