//! Onboarding API - wire types and HTTP client for the onboarding services
//!
//! Two remote endpoints back the onboarding form: a corporation-number
//! lookup and the profile-details submission. Both are reached through the
//! [`OnboardingApi`] trait so the form logic can run against the real
//! service or an in-process fake.

pub mod types;
pub mod api;
pub mod client;
pub mod config;
pub mod error;

pub use types::*;
pub use api::OnboardingApi;
pub use client::HttpOnboardingApi;
pub use config::ApiConfig;
pub use error::ApiError;

/// Path segment of the corporation-number lookup endpoint
pub const CORPORATION_NUMBER_PATH: &str = "corporation-number";

/// Path segment of the profile submission endpoint
pub const PROFILE_DETAILS_PATH: &str = "profile-details";
