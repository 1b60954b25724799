use async_trait::async_trait;
use serde::Deserialize;

use super::{ExternalIdentity, IdentityVerifier, VerifyError};

/// Verifies Google ID tokens through the `tokeninfo` introspection endpoint.
#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    tokeninfo_url: String,
    client_id: Option<String>,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    sub: Option<String>,
    // Older tokeninfo versions name the subject differently.
    user_id: Option<String>,
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    aud: Option<String>,
}

impl GoogleVerifier {
    /// `http_client` is built once at startup and carries the request timeout.
    pub fn new(
        http_client: reqwest::Client,
        tokeninfo_url: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            tokeninfo_url: tokeninfo_url.into(),
            client_id,
            http_client,
        }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    fn provider_id(&self) -> &str {
        "google"
    }

    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, VerifyError> {
        let resp = self
            .http_client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", assertion)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(VerifyError::VerificationFailed(status));
        }

        let info: TokenInfoResponse = resp.json().await?;

        if let Some(expected) = &self.client_id {
            if info.aud.as_deref() != Some(expected.as_str()) {
                return Err(VerifyError::AudienceMismatch);
            }
        }

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(VerifyError::IncompleteIdentity)?;
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.clone());
        let external_id = info
            .sub
            .or(info.user_id)
            .or(info.id)
            .ok_or(VerifyError::IncompleteIdentity)?;

        Ok(ExternalIdentity {
            external_id,
            email,
            name,
        })
    }
}
