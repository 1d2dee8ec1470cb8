//! HTTP client for the onboarding service

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use tracing::{debug, warn};

use crate::api::OnboardingApi;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::types::*;
use crate::{CORPORATION_NUMBER_PATH, PROFILE_DETAILS_PATH};

/// Onboarding service over HTTP
#[derive(Debug, Clone)]
pub struct HttpOnboardingApi {
    client: Client,
    base_url: Url,
}

impl HttpOnboardingApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let trimmed = config.base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| ApiError::Config(format!("invalid base url {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("base url {:?} cannot carry a path", config.base_url)));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base url {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a failure response into `ApiError::Rejected`, keeping the body's message
async fn rejection(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let message = match response.bytes().await {
        Ok(bytes) => rejection_message(&bytes),
        Err(_) => None,
    };
    ApiError::Rejected { status, message }
}

fn rejection_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
}

/// A lookup failure status may still carry a definitive `valid: false` answer
fn lookup_rejection(status: u16, body: &[u8]) -> Result<CorporationValidation, ApiError> {
    match serde_json::from_slice::<CorporationValidation>(body) {
        Ok(validation) if !validation.valid => Ok(validation),
        _ => Err(ApiError::Rejected {
            status,
            message: rejection_message(body),
        }),
    }
}

#[async_trait]
impl OnboardingApi for HttpOnboardingApi {
    async fn validate_corporation_number(&self, number: &str) -> Result<CorporationValidation, ApiError> {
        let url = self.endpoint(&[CORPORATION_NUMBER_PATH, number])?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!("Corporation lookup for {} failed: {}", number, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            let answer = lookup_rejection(status.as_u16(), &body);
            match &answer {
                Ok(validation) => debug!(
                    "Corporation number {} rejected: {}",
                    number,
                    validation.message.as_deref().unwrap_or("no message")
                ),
                Err(err) => warn!("Corporation lookup for {} rejected: {}", number, err),
            }
            return answer;
        }

        Ok(response.json::<CorporationValidation>().await?)
    }

    async fn submit_profile(&self, profile: &ProfileDetails) -> Result<(), ApiError> {
        let url = self.endpoint(&[PROFILE_DETAILS_PATH])?;
        debug!("POST {}", url);

        let response = self.client.post(url).json(profile).send().await.map_err(|e| {
            warn!("Profile submission failed: {}", e);
            ApiError::from(e)
        })?;

        if !response.status().is_success() {
            let err = rejection(response).await;
            warn!("Profile submission rejected: {}", err);
            return Err(err);
        }

        Ok(())
    }
}
