use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const ADMIN_SUBJECT: &str = "admin";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Failed to issue token: {0}")]
    Issue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub iat: i64,
}

/// Marker inserted into request extensions once the admin token checks out.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub issued_at: i64,
}

/// Single shared password for the small group running the site. There is no
/// per-admin identity and tokens never expire.
#[derive(Clone)]
pub struct AdminGate {
    password: String,
    secret: Vec<u8>,
}

impl AdminGate {
    pub fn new(password: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        AdminGate {
            password: password.into(),
            secret: secret.into(),
        }
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        !self.password.is_empty() && candidate == self.password
    }

    pub fn issue_token(&self) -> Result<String, AuthError> {
        let claims = AdminClaims {
            sub: ADMIN_SUBJECT.to_string(),
            iat: Utc::now().timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AuthError::Issue(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &validation,
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.sub != ADMIN_SUBJECT {
            return Err(AuthError::InvalidToken("unexpected subject".into()));
        }
        Ok(data.claims)
    }
}

pub fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn unauthorized(message: String) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Rejects requests without a valid admin token.
pub async fn admin_middleware(
    State(gate): State<Arc<AdminGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    let result = extract_bearer_token(&req)
        .ok_or(AuthError::MissingToken)
        .and_then(|token| gate.validate_token(token));

    match result {
        Ok(claims) => {
            debug!("Admin request authorized: {} {}", req.method(), req.uri());
            req.extensions_mut().insert(AdminSession {
                issued_at: claims.iat,
            });
            next.run(req).await
        }
        Err(e) => {
            warn!("Rejected admin request {} {}: {}", req.method(), req.uri(), e);
            unauthorized(e.to_string())
        }
    }
}
