//! Bearer token verification.
//!
//! Sessions and user accounts live elsewhere; this only checks that an
//! HS256 access token is well formed, correctly signed and unexpired.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::errors::ApiFailure;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            issuer: config.jwt_issuer.clone(),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Sign a token for `subject`. A negative `ttl` yields an already
    /// expired token.
    pub fn issue(
        &self,
        subject: impl Into<String>,
        roles: Vec<String>,
        ttl: Duration,
    ) -> Result<String, ApiFailure> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.into(),
            roles,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        match encode(&Header::default(), &claims, &self.encoding_key) {
            Ok(token) => Ok(token),
            Err(e) => Err(ApiFailure::unclassified(e)),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Verify the `Authorization: Bearer <token>` header
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<Claims, ApiFailure> {
        let Some(token) = bearer_token(headers) else {
            return Err(ApiFailure::unauthenticated());
        };
        self.verify(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FailureKind;
    use axum::http::HeaderValue;

    fn verifier(secret: &str) -> TokenVerifier {
        TokenVerifier::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_issuer: "tenant-api".to_string(),
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_round_trip_claims() {
        let v = verifier("s3cret");
        let token = v
            .issue("user-1", vec![ADMIN_ROLE.to_string()], Duration::minutes(5))
            .unwrap();
        let claims = v.verify_headers(&headers(&format!("Bearer {token}"))).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.has_role(ADMIN_ROLE));
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthenticated() {
        let v = verifier("s3cret");
        for h in [HeaderMap::new(), headers("Basic abc"), headers("Bearer   ")] {
            let failure = v.verify_headers(&h).unwrap_err();
            assert!(matches!(failure.kind(), FailureKind::Unauthenticated));
            assert!(failure.origin().file.ends_with("auth.rs"));
        }
    }

    #[test]
    fn test_expired_token() {
        let v = verifier("s3cret");
        let token = v.issue("user-1", vec![], Duration::minutes(-5)).unwrap();
        let failure = v.verify(&token).unwrap_err();
        assert!(matches!(failure.kind(), FailureKind::TokenExpired));
    }

    #[test]
    fn test_wrong_signature_and_garbage() {
        let token = verifier("one").issue("u", vec![], Duration::minutes(5)).unwrap();
        let failure = verifier("two").verify(&token).unwrap_err();
        assert!(matches!(failure.kind(), FailureKind::TokenInvalid));

        let failure = verifier("one").verify("not.a.jwt").unwrap_err();
        assert!(matches!(failure.kind(), FailureKind::TokenInvalid));
    }
}
