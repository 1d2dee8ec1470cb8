//! The onboarding form as driven by a UI event loop

use std::sync::Arc;
use std::time::Duration;

use onboarding_api::{ApiConfig, OnboardingApi};
use tokio::sync::watch;
use tracing::debug;

use crate::corporation::{CorporationChecker, Lookup, PendingCheck};
use crate::store::{BlurEffect, FormStore};
use crate::submission::{Banner, SubmissionPhase};
use crate::types::{Field, FormData, TouchedSet, ValidationErrors};

/// Form state plus the remote checks and submission that act on it.
///
/// `set_field` and `blur` never wait. A corporation lookup started by
/// `blur` runs in the background and is applied by `settle_validation`;
/// answers for a value the user has since changed are dropped.
pub struct OnboardingForm<A: OnboardingApi> {
    pub(crate) store: FormStore,
    pub(crate) checker: CorporationChecker<A>,
    pub(crate) api: Arc<A>,
    pub(crate) request_timeout: Duration,
    pub(crate) in_flight: Option<PendingCheck>,
    pub(crate) phase: watch::Sender<SubmissionPhase>,
}

impl<A: OnboardingApi> OnboardingForm<A> {
    pub fn new(api: A, config: &ApiConfig) -> Self {
        Self::with_shared_api(Arc::new(api), config)
    }

    pub fn with_shared_api(api: Arc<A>, config: &ApiConfig) -> Self {
        let (phase, _) = watch::channel(SubmissionPhase::Idle);
        Self {
            store: FormStore::new(),
            checker: CorporationChecker::new(api.clone(), config),
            api,
            request_timeout: config.request_timeout(),
            in_flight: None,
            phase,
        }
    }

    pub fn data(&self) -> &FormData {
        self.store.data()
    }

    pub fn value(&self, field: Field) -> &str {
        self.store.value(field)
    }

    pub fn errors(&self) -> &ValidationErrors {
        self.store.errors()
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.store.error(field)
    }

    pub fn touched(&self) -> &TouchedSet {
        self.store.touched()
    }

    pub fn checker(&self) -> &CorporationChecker<A> {
        &self.checker
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.store.set_field(field, value);
        if self.phase.borrow().is_settled() {
            self.set_phase(SubmissionPhase::Idle);
        }
    }

    /// Leave a field: run its format rule and, for a 9-character
    /// corporation number, start or join the remote lookup.
    pub fn blur(&mut self, field: Field) {
        let key = match self.store.blur(field) {
            BlurEffect::CheckCorporation(key) => key,
            BlurEffect::None => {
                if field == Field::CorporationNumber {
                    self.in_flight = None;
                }
                return;
            }
        };

        match self.checker.check(&key) {
            Lookup::Ready(outcome) => {
                self.store.apply_remote(&key, &outcome);
                self.in_flight = None;
            }
            Lookup::Pending(pending) => self.in_flight = Some(pending),
            Lookup::Skipped => {}
        }
    }

    /// True while a lookup for the current corporation number is outstanding
    pub fn is_validating(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|pending| pending.key() == self.store.value(Field::CorporationNumber))
    }

    pub fn is_submitting(&self) -> bool {
        *self.phase.borrow() == SubmissionPhase::Submitting
    }

    /// Whether the submit control should be enabled
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && !self.is_validating()
    }

    /// Wait for the outstanding lookup, if any, and apply its answer.
    /// Returns whether the error state was updated.
    pub async fn settle_validation(&mut self) -> bool {
        let Some(pending) = self.in_flight.take() else {
            return false;
        };
        let key = pending.key().to_string();
        let outcome = pending.outcome().await;
        let applied = self.store.apply_remote(&key, &outcome);
        if !applied {
            debug!("Corporation answer for {} not applied", key);
        }
        applied
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase.borrow().clone()
    }

    /// Observe submission phase changes, e.g. to render the submitting state
    pub fn subscribe(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// Banner message of the last failed submission
    pub fn submit_error(&self) -> Option<String> {
        match &*self.phase.borrow() {
            SubmissionPhase::Failed { message } => Some(message.clone()),
            _ => None,
        }
    }

    pub fn banner(&self) -> Option<Banner> {
        self.phase.borrow().banner()
    }

    pub fn is_success(&self) -> bool {
        *self.phase.borrow() == SubmissionPhase::Succeeded
    }

    pub(crate) fn set_phase(&self, phase: SubmissionPhase) {
        debug!("Submission phase: {:?}", phase);
        self.phase.send_replace(phase);
    }
}
