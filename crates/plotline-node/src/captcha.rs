//! CAPTCHA verification for the public sign-up path.

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Google reCAPTCHA verification endpoint.
pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Checks a client-supplied CAPTCHA token.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// `Ok(false)` means the token was rejected; `Err` means verification
    /// itself could not be completed.
    async fn verify(&self, token: &str) -> Result<bool>;
}

/// reCAPTCHA site-verify client.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    verify_url: String,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl RecaptchaVerifier {
    /// Create a verifier with the site secret.
    pub fn new(secret: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            secret: secret.into(),
            verify_url: RECAPTCHA_VERIFY_URL.to_string(),
        })
    }

    /// Point at a different verification endpoint.
    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str) -> Result<bool> {
        let response: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            debug!(error_codes = ?response.error_codes, "captcha_rejected");
        }
        Ok(response.success)
    }
}
