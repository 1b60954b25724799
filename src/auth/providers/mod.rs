pub mod google;

use async_trait::async_trait;

/// Identity asserted by a third-party provider after it vouched for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("provider rejected the token with status {0}")]
    VerificationFailed(reqwest::StatusCode),

    #[error("provider response carried no email")]
    IncompleteIdentity,

    #[error("token was issued for a different client")]
    AudienceMismatch,

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Checks an assertion with the party that issued it. Implementations must
/// never accept a token they could not confirm with the provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    fn provider_id(&self) -> &str;

    async fn verify(&self, assertion: &str) -> Result<ExternalIdentity, VerifyError>;
}
