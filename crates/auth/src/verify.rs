//! Admin verification authority client.
//!
//! The verification endpoint is a privileged backend function that, given a
//! valid bearer credential, authoritatively answers whether the user is an
//! admin. This crate never infers admin status from local session claims;
//! the endpoint's payload is the only source of truth.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use ridgeline_core::AccessToken;

use crate::config::AuthConfig;

/// Errors that can occur calling the verification authority.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Network-level failure (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The authority answered with a non-success status.
    #[error("verification endpoint returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for diagnostics.
        body: String,
    },

    /// The authority's response body was not valid JSON.
    #[error("failed to parse verification response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A source of authoritative admin-status answers.
///
/// The gate treats implementations as a black box returning a JSON payload
/// or a failure; interpreting the payload (strictly) is the gate's job.
pub trait AdminVerifier: Send + Sync {
    /// Ask the authority whether the bearer of `access_token` is an admin.
    fn verify(
        &self,
        access_token: &AccessToken,
    ) -> impl Future<Output = Result<Value, VerifyError>> + Send;
}

impl<T: AdminVerifier> AdminVerifier for Arc<T> {
    fn verify(
        &self,
        access_token: &AccessToken,
    ) -> impl Future<Output = Result<Value, VerifyError>> + Send {
        (**self).verify(access_token)
    }
}

/// HTTP client for the hosted admin-verify endpoint.
pub struct VerifyClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl VerifyClient {
    /// Create a new verification client.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the underlying HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.verify_url.clone(),
            api_key: config.backend_api_key.expose_secret().to_string(),
        })
    }
}

impl AdminVerifier for VerifyClient {
    async fn verify(&self, access_token: &AccessToken) -> Result<Value, VerifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(access_token.expose())
            .header("apikey", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Verification endpoint returned non-success status"
            );
            return Err(VerifyError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        let payload: Value = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse verification response"
            );
            VerifyError::Parse(e)
        })?;

        Ok(payload)
    }
}
