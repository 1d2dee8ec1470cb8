//! Remote collaborator trait

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{CorporationValidation, ProfileDetails};

/// The two remote calls the onboarding form depends on.
///
/// Implemented by [`crate::HttpOnboardingApi`] for the real service; tests
/// provide scripted in-memory implementations.
#[async_trait]
pub trait OnboardingApi: Send + Sync + 'static {
    /// Look up a corporation number
    async fn validate_corporation_number(&self, number: &str) -> Result<CorporationValidation, ApiError>;

    /// Submit the completed profile
    async fn submit_profile(&self, profile: &ProfileDetails) -> Result<(), ApiError>;
}
