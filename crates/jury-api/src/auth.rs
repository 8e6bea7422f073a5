//! # Operator Authentication
//!
//! Every `/v1` route is an operator action, guarded by one static bearer
//! token read from `AUTH_TOKEN`. Without a token the API is open, which is
//! how local development and the integration tests run it. Health probes
//! and the OpenAPI document are mounted outside this middleware.

use axum::extract::Request;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// The operator token, shared with the middleware as a request extension.
#[derive(Clone, Default)]
pub struct OperatorAuth {
    token: Option<String>,
}

impl std::fmt::Debug for OperatorAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorAuth")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingHeader,
    NotBearer,
    WrongToken,
}

impl AuthRejection {
    fn message(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing authorization header",
            Self::NotBearer => "authorization header must use Bearer scheme",
            Self::WrongToken => "invalid bearer token",
        }
    }
}

impl OperatorAuth {
    /// Blank tokens count as unset.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check the `Authorization` header of a request.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), AuthRejection> {
        let Some(expected) = &self.token else {
            return Ok(());
        };
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection::MissingHeader)?;
        let provided = value
            .strip_prefix("Bearer ")
            .ok_or(AuthRejection::NotBearer)?;
        if tokens_match(provided.trim(), expected) {
            Ok(())
        } else {
            Err(AuthRejection::WrongToken)
        }
    }
}

/// Compare digests so neither the contents nor the length of the expected
/// token leak through timing.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

/// Reject `/v1` requests that do not carry the operator token.
pub async fn require_operator(request: Request, next: Next) -> Response {
    let verdict = match request.extensions().get::<OperatorAuth>() {
        Some(auth) => auth.check(request.headers()),
        None => Ok(()),
    };
    match verdict {
        Ok(()) => next.run(request).await,
        Err(rejection) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = rejection.message(),
                "operator request rejected"
            );
            AppError::Unauthorized(rejection.message().to_string()).into_response()
        }
    }
}
