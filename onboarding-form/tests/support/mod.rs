#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use onboarding_api::{ApiError, CorporationValidation, OnboardingApi, ProfileDetails};
use tokio::sync::Notify;

/// Scripted onboarding service.
///
/// Corporation numbers answer valid unless scripted otherwise. Lookups and
/// submissions can be held behind a gate to observe the in-flight state.
#[derive(Default)]
pub struct FakeApi {
    lookups: Mutex<HashMap<String, Result<CorporationValidation, ApiError>>>,
    submit_result: Mutex<Option<ApiError>>,
    lookup_gate: Mutex<Option<Arc<Notify>>>,
    submit_gate: Mutex<Option<Arc<Notify>>>,
    pub lookup_calls: Mutex<Vec<String>>,
    pub submissions: Mutex<Vec<ProfileDetails>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, number: &str, result: Result<CorporationValidation, ApiError>) {
        self.lookups.lock().unwrap().insert(number.to_string(), result);
    }

    pub fn fail_submissions(&self, err: ApiError) {
        *self.submit_result.lock().unwrap() = Some(err);
    }

    pub fn gate_lookups(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.lookup_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_submissions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_calls.lock().unwrap().len()
    }

    pub fn submitted(&self) -> Vec<ProfileDetails> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl OnboardingApi for FakeApi {
    async fn validate_corporation_number(&self, number: &str) -> Result<CorporationValidation, ApiError> {
        self.lookup_calls.lock().unwrap().push(number.to_string());
        let gate = self.lookup_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.lookups
            .lock()
            .unwrap()
            .get(number)
            .cloned()
            .unwrap_or_else(|| Ok(CorporationValidation::valid(number)))
    }

    async fn submit_profile(&self, profile: &ProfileDetails) -> Result<(), ApiError> {
        self.submissions.lock().unwrap().push(profile.clone());
        let gate = self.submit_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.submit_result.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
