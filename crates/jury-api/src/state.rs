//! # Application State
//!
//! Handlers reach the dispute service through [`AppState`]. All dispute
//! state lives inside [`JuryService`]; this layer adds only the HTTP
//! server's own settings.

use std::sync::Arc;

use jury_engine::JuryService;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// A server setting in the environment that could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{var} is invalid: {reason}")]
pub struct ServerConfigError {
    pub var: &'static str,
    pub reason: String,
}

/// HTTP server settings.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Operator bearer token; `None` leaves the `/v1` routes open.
    pub auth_token: Option<String>,
    /// Largest accepted request body.
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auth_token: None,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("body_limit_bytes", &self.body_limit_bytes)
            .finish()
    }
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN` and `MAX_BODY_BYTES`.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`AppConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServerConfigError> {
        let defaults = Self::default();
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ServerConfigError {
                var: "PORT",
                reason: format!("expected a port number, got {raw:?}"),
            })?,
            None => defaults.port,
        };
        let body_limit_bytes = match lookup("MAX_BODY_BYTES") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ServerConfigError {
                        var: "MAX_BODY_BYTES",
                        reason: format!("expected a positive byte count, got {raw:?}"),
                    })
                }
            },
            None => defaults.body_limit_bytes,
        };
        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.trim().is_empty());
        Ok(Self {
            port,
            auth_token,
            body_limit_bytes,
        })
    }
}

/// Cloneable handle shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JuryService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn with_config(service: Arc<JuryService>, config: AppConfig) -> Self {
        Self { service, config }
    }
}
