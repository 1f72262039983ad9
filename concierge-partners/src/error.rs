use concierge_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{partner} returned HTTP {code}")]
    Status {
        partner: &'static str,
        code: u16,
        body: String,
    },
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl From<serde_json::Error> for PartnerError {
    fn from(err: serde_json::Error) -> Self {
        PartnerError::Decode(err.to_string())
    }
}

impl From<PartnerError> for StoreError {
    fn from(err: PartnerError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type PartnerResult<T> = Result<T, PartnerError>;
