//! JWT credentials for GRIP control endpoints (HS256, `iss` + `exp`).

use std::time::Duration;

use grip_core::ControlKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Token validity window.
const TOKEN_VALIDITY: Duration = Duration::from_secs(3600);

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlClaims {
    pub iss: String,
    pub exp: i64,
}

/// Issuer and signing key for one endpoint.
#[derive(Clone, Debug)]
pub struct JwtAuth {
    iss: String,
    key: ControlKey,
}

impl JwtAuth {
    pub fn new(iss: impl Into<String>, key: ControlKey) -> Self {
        Self {
            iss: iss.into(),
            key,
        }
    }

    pub fn iss(&self) -> &str {
        &self.iss
    }

    /// Sign a fresh token. Called per request so tokens never go stale.
    pub fn token(&self) -> Result<String, PublishError> {
        let claims = ControlClaims {
            iss: self.iss.clone(),
            exp: chrono::Utc::now().timestamp() + TOKEN_VALIDITY.as_secs() as i64,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| PublishError::Auth(e.to_string()))
    }

    pub fn authorization_header(&self) -> Result<String, PublishError> {
        Ok(format!("Bearer {}", self.token()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    #[test]
    fn token_verifies_with_same_key() {
        let auth = JwtAuth::new("realm", ControlKey::new(b"secret".to_vec()));
        let token = auth.token().unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        let decoded = jsonwebtoken::decode::<ControlClaims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "realm");
        let remaining = decoded.claims.exp - chrono::Utc::now().timestamp();
        assert!((3500..=3600).contains(&remaining), "remaining: {remaining}");
    }

    #[test]
    fn token_rejected_with_other_key() {
        let auth = JwtAuth::new("realm", ControlKey::new(b"secret".to_vec()));
        let token = auth.token().unwrap();
        let result = jsonwebtoken::decode::<ControlClaims>(
            &token,
            &DecodingKey::from_secret(b"other"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn header_has_bearer_scheme() {
        let auth = JwtAuth::new("realm", ControlKey::new(b"k".to_vec()));
        assert!(auth.authorization_header().unwrap().starts_with("Bearer ey"));
    }
}
