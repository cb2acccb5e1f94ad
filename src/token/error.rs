use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("secret must be at least {0} bytes")]
    WeakSecret(usize),
    #[error("access and refresh secrets must differ")]
    DuplicateSecret,
    #[error("invalid ttl: {0}")]
    InvalidTtl(String),
}
