use secrecy::SecretString;

use crate::token::{self, TokenCodec};

/// Validated runtime configuration shared across the service.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub store_fail_open: bool,
}

impl GlobalArgs {
    /// Build the token codec from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for weak or duplicate secrets; startup must abort
    /// in that case.
    pub fn codec(&self) -> Result<TokenCodec, token::Error> {
        TokenCodec::new(
            self.access_secret.clone(),
            self.refresh_secret.clone(),
            self.issuer.clone(),
            self.audience.clone(),
            self.access_ttl_seconds,
            self.refresh_ttl_seconds,
        )
    }
}
