use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// ApiError
///
/// The application-wide error taxonomy. Every fallible operation in the
/// repository, auth, and handler layers resolves to one of these variants,
/// so callers always receive a stable kind and message.
///
/// Variant semantics:
/// - `NotFound`: the entity is absent *or* not visible to the requester.
///   Existence under a different owner is deliberately indistinguishable
///   from non-existence (prevents enumeration of other users' data).
/// - `Conflict`: a storage-level uniqueness violation (duplicate email,
///   duplicate list+item pair), surfaced with the offending field.
/// - `Invalid`: input rejected before it reaches storage (e.g., a negative
///   quantity, a dangling list/item reference).
/// - `Forbidden`: authenticated but lacking the required role.
/// - `Unauthorized`: bad/expired token, credentials mismatch, or a blocked
///   account.
/// - `Internal`: integration bugs (missing identity where one is required)
///   and unexpected datastore failures. Details are logged, not returned.
#[derive(Debug)]
pub enum ApiError {
    NotFound { entity: &'static str, id: Uuid },
    Conflict { field: &'static str, message: String },
    Invalid { field: &'static str, message: String },
    Forbidden { message: String },
    Unauthorized(String),
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable kind, used as the `error` field of the JSON body.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::Invalid { .. } => "INVALID",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Invalid { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound { entity, id } => {
                write!(f, "{} with id {} not found", entity, id)
            }
            ApiError::Conflict { field, message } => write!(f, "{} ({})", message, field),
            ApiError::Invalid { field, message } => write!(f, "{} ({})", message, field),
            ApiError::Forbidden { message } => write!(f, "{}", message),
            ApiError::Unauthorized(message) => write!(f, "{}", message),
            ApiError::Internal(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// IntoResponse Implementation
///
/// Maps the taxonomy onto HTTP statuses and a small JSON body of the shape
/// `{"error": KIND, "message": ...}`. Internal failures are logged with
/// their full detail and replaced by a generic message on the wire.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}
