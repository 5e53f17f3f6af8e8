use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use hive_signup::SignupError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or incomplete request body
    #[error("{0}")]
    BadRequest(String),

    /// Bearer token missing or wrong
    #[error("valid Bearer token required")]
    Unauthorized,

    /// Endpoint disabled by configuration
    #[error("admin API is disabled")]
    Forbidden,

    #[error(transparent)]
    Signup(#[from] SignupError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Signup(e) => match e {
                SignupError::InvalidUsername(_) | SignupError::MalformedAmount(_) => {
                    StatusCode::BAD_REQUEST
                }
                SignupError::DuplicateUsername(_) | SignupError::CreationInProgress(_) => {
                    StatusCode::CONFLICT
                }
                SignupError::NotFound(_) => StatusCode::NOT_FOUND,
                SignupError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                SignupError::Database(_)
                | SignupError::Http(_)
                | SignupError::Serialization(_)
                | SignupError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "internal error");
                "An internal error occurred".to_string()
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::warn!(error = %self, "upstream unavailable");
                self.to_string()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_errors_map_to_statuses() {
        let cases = [
            (SignupError::InvalidUsername("x".into()), 400),
            (SignupError::MalformedAmount("x".into()), 400),
            (SignupError::DuplicateUsername("x".into()), 409),
            (SignupError::NotFound("x".into()), 404),
            (SignupError::CreationInProgress("x".into()), 409),
            (SignupError::UpstreamUnavailable("x".into()), 503),
            (SignupError::Internal("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code().as_u16(), status);
        }
        assert_eq!(ApiError::Unauthorized.status_code().as_u16(), 401);
        assert_eq!(ApiError::Forbidden.status_code().as_u16(), 403);
    }

    #[actix_rt::test]
    async fn internal_details_are_not_leaked() {
        let resp = ApiError::from(SignupError::Internal("db path /secret".into())).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["error"], "An internal error occurred");
    }

    #[actix_rt::test]
    async fn client_errors_carry_message() {
        let resp = ApiError::from(SignupError::DuplicateUsername("alice".into())).error_response();
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["error"], "username already registered: alice");
    }
}
