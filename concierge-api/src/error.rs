use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use concierge_partners::PartnerError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    /// 400 with a machine-readable code, e.g. `missing_parameters`.
    BadRequest { code: &'static str, message: String },
    NotFound { code: &'static str, message: String },
    /// A partner call failed; `code` names the failed operation.
    Upstream { code: &'static str, source: PartnerError },
    ServiceUnavailable(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest { code, message: message.into() }
    }

    pub fn upstream(code: &'static str) -> impl FnOnce(PartnerError) -> Self {
        move |source| AppError::Upstream { code, source }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            AppError::Upstream { code, source } => {
                tracing::error!("Partner call failed ({}): {}", code, source);
                let status = match source {
                    PartnerError::MissingCredentials(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, code, source.to_string())
            }
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
