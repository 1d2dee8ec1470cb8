//! Onboarding form - validation and submission orchestration
//!
//! The form collects an applicant's name, phone number and corporation
//! number. Fields are checked synchronously against format rules on blur,
//! the corporation number is additionally confirmed by a remote lookup, and
//! a final submit re-validates everything (waiting on the lookup) before the
//! profile is sent.
//!
//! Everything runs cooperatively on one logical thread: [`OnboardingForm`]
//! is driven by a UI event loop calling `set_field`, `blur`,
//! `settle_validation` and `submit`.

pub mod types;
pub mod validation;
pub mod corporation;
pub mod store;
pub mod form;
pub mod submission;

pub use types::*;
pub use validation::{validate_field, validate_form};
pub use corporation::{CheckOutcome, CorporationCache, CorporationChecker, Lookup, PendingCheck};
pub use store::{BlurEffect, FormStore};
pub use form::OnboardingForm;
pub use submission::{Banner, SubmissionPhase, SubmitOutcome};

pub use onboarding_api::{ApiConfig, ApiError, OnboardingApi};
