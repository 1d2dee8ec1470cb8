//! Submit-time validation and the profile submission

use tokio::time::timeout;
use tracing::{info, warn};

use onboarding_api::{ApiError, OnboardingApi};

use crate::corporation::{CheckOutcome, Lookup};
use crate::form::OnboardingForm;
use crate::types::{Field, ValidationErrors};
use crate::validation::{is_lookup_candidate, validate_form};

pub const SUBMISSION_FAILED_MESSAGE: &str = "Submission failed. Please try again.";
pub const SUBMISSION_SUCCEEDED_MESSAGE: &str = "Form submitted successfully!";

/// Where the form is in its submission lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    Validating,
    /// Validation failed; errors are on the fields
    Invalid,
    Submitting,
    /// The profile was accepted and the form was reset
    Succeeded,
    Failed { message: String },
}

impl SubmissionPhase {
    /// A finished attempt whose banner or errors stay until the next edit
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SubmissionPhase::Invalid | SubmissionPhase::Succeeded | SubmissionPhase::Failed { .. }
        )
    }
}

/// Form-level message shown after a submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(&'static str),
    Error(String),
}

impl SubmissionPhase {
    pub fn banner(&self) -> Option<Banner> {
        match self {
            SubmissionPhase::Succeeded => Some(Banner::Success(SUBMISSION_SUCCEEDED_MESSAGE)),
            SubmissionPhase::Failed { message } => Some(Banner::Error(message.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was sent
    Invalid(ValidationErrors),
    Submitted,
    /// The service refused or could not be reached; values are kept
    Failed(String),
}

impl<A: OnboardingApi> OnboardingForm<A> {
    /// Validate everything and, if the form is clean, send the profile.
    ///
    /// A 9-character corporation number must be confirmed by the lookup for
    /// that exact value; a running lookup is awaited, a missing one is
    /// started. There is no retry: a failed submission waits for the next
    /// call.
    pub async fn submit(&mut self) -> SubmitOutcome {
        self.set_phase(SubmissionPhase::Validating);

        let mut errors = validate_form(self.store.data());
        let number = self.store.value(Field::CorporationNumber).to_string();
        if is_lookup_candidate(&number) {
            let outcome = self.corporation_outcome(&number).await;
            if let Some(message) = outcome.error_message() {
                errors.set(Field::CorporationNumber, message);
            }
        }

        if !errors.is_empty() {
            info!("Submission blocked by {} invalid field(s)", errors.len());
            self.store.replace_errors(errors.clone());
            self.set_phase(SubmissionPhase::Invalid);
            return SubmitOutcome::Invalid(errors);
        }
        self.store.replace_errors(ValidationErrors::default());

        let profile = self.store.data().to_profile();
        self.set_phase(SubmissionPhase::Submitting);

        let result = match timeout(self.request_timeout, self.api.submit_profile(&profile)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        };

        match result {
            Ok(()) => {
                info!("Profile submitted for corporation {}", profile.corporation_number);
                self.store.reset();
                self.in_flight = None;
                self.set_phase(SubmissionPhase::Succeeded);
                SubmitOutcome::Submitted
            }
            Err(err) => {
                warn!("Profile submission failed: {}", err);
                let message = err
                    .remote_message()
                    .unwrap_or(SUBMISSION_FAILED_MESSAGE)
                    .to_string();
                self.set_phase(SubmissionPhase::Failed { message: message.clone() });
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Lookup answer for `number`, joining the outstanding one when it matches
    async fn corporation_outcome(&mut self, number: &str) -> CheckOutcome {
        let pending = match self.in_flight.take() {
            Some(pending) if pending.key() == number => pending,
            _ => match self.checker.check(number) {
                Lookup::Ready(outcome) => return outcome,
                Lookup::Pending(pending) => pending,
                Lookup::Skipped => return CheckOutcome::Failed { message: None },
            },
        };
        pending.outcome().await
    }
}
