//! Bearer token issuance and verification.
//!
//! Tokens are HMAC-family JWTs with a fixed 24 hour lifetime. The secret is
//! configured as the same JSON document the GraphQL layer consumes, e.g.
//! `{"type":"HS256","key":"..."}`, so both sides verify the same tokens.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Token lifetime: 24 hours from issuance.
pub const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub email: String,
    pub full_name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token not active yet")]
    NotYetValid,
    #[error("missing or invalid token claims")]
    MissingClaims,
}

/// Secret document shared with the GraphQL layer.
#[derive(Deserialize)]
struct SecretDocument {
    #[serde(rename = "type")]
    algorithm: String,
    key: String,
}

#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build a service from the JSON secret document.
    ///
    /// # Errors
    /// Returns an error on unparsable JSON or a non-HMAC algorithm; tokens
    /// here are symmetric only.
    pub fn from_secret(document: &str) -> Result<Self> {
        let secret: SecretDocument =
            serde_json::from_str(document).context("failed to parse JWT secret document")?;

        let algorithm = secret
            .algorithm
            .parse::<Algorithm>()
            .map_err(|_| anyhow!("unknown JWT algorithm: {}", secret.algorithm))?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(anyhow!(
                "unsupported JWT algorithm: {}, expected an HMAC variant",
                secret.algorithm
            ));
        }

        Ok(Self::new(algorithm, secret.key.as_bytes()))
    }

    #[must_use]
    pub fn new(algorithm: Algorithm, key: &[u8]) -> Self {
        Self {
            algorithm,
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
        }
    }

    /// Issue a token for an authenticated account.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn issue(&self, sub: &str, role: &str, email: &str, full_name: &str) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECONDS,
        };

        self.sign(&claims)
    }

    /// Sign a fully built claim set.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .context("failed to sign token")
    }

    /// Verify a token and return its claims.
    ///
    /// Signature, pinned algorithm, `exp` (zero leeway) and `nbf` when
    /// present are all checked before the claim payload itself.
    ///
    /// # Errors
    /// Returns the matching [`TokenError`] kind.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|err| classify(&err))?;

        if data.claims.sub.trim().is_empty() || data.claims.role.trim().is_empty() {
            return Err(TokenError::MissingClaims);
        }

        Ok(data.claims)
    }
}

fn classify(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::BadSignature
        }
        ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => TokenError::MissingClaims,
        _ => TokenError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> TokenService {
        TokenService::new(Algorithm::HS256, b"test-secret")
    }

    fn claims_at(iat: i64, exp: i64) -> Claims {
        Claims {
            sub: "7b51b160-9a8e-4c5c-9f6c-2f4f4fb0a001".to_string(),
            role: "hr".to_string(),
            email: "ines@kadra.test".to_string(),
            full_name: "Inés Oliveira".to_string(),
            iat,
            exp,
        }
    }

    #[test]
    fn from_secret_parses_hasura_style_document() -> Result<()> {
        let tokens = TokenService::from_secret(r#"{"type":"HS256","key":"default-secret-key"}"#)?;
        let token = tokens.issue("id", "admin", "a@b.c", "A B")?;
        assert_eq!(tokens.verify(&token).map(|c| c.role), Ok("admin".to_string()));
        Ok(())
    }

    #[test]
    fn from_secret_rejects_asymmetric_algorithms() {
        assert!(TokenService::from_secret(r#"{"type":"RS256","key":"k"}"#).is_err());
        assert!(TokenService::from_secret(r#"{"type":"ES256","key":"k"}"#).is_err());
        assert!(TokenService::from_secret(r#"{"type":"bogus","key":"k"}"#).is_err());
        assert!(TokenService::from_secret("not json").is_err());
    }

    #[test]
    fn issue_then_verify_round_trips() -> Result<()> {
        let tokens = service();
        let token = tokens.issue("user-1", "hr", "ines@kadra.test", "Inés Oliveira")?;

        let claims = tokens.verify(&token).expect("token should verify");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, "hr");
        assert_eq!(claims.email, "ines@kadra.test");
        assert_eq!(claims.full_name, "Inés Oliveira");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn expired_token_is_reported_expired() -> Result<()> {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = tokens.sign(&claims_at(now - 2 * TOKEN_TTL_SECONDS, now - TOKEN_TTL_SECONDS))?;

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
        Ok(())
    }

    #[test]
    fn foreign_secret_is_a_bad_signature() -> Result<()> {
        let ours = service();
        let theirs = TokenService::new(Algorithm::HS256, b"other-secret");
        let token = theirs.issue("user-1", "hr", "a@b.c", "A B")?;

        assert_eq!(ours.verify(&token), Err(TokenError::BadSignature));
        Ok(())
    }

    #[test]
    fn algorithm_confusion_is_rejected() -> Result<()> {
        let ours = service();
        // Same key bytes, different header algorithm.
        let confused = TokenService::new(Algorithm::HS384, b"test-secret");
        let token = confused.issue("user-1", "hr", "a@b.c", "A B")?;

        assert_eq!(ours.verify(&token), Err(TokenError::BadSignature));
        Ok(())
    }

    #[test]
    fn garbage_token_is_malformed() {
        let tokens = service();
        assert_eq!(tokens.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(tokens.verify(""), Err(TokenError::Malformed));
        assert_eq!(tokens.verify("a.b.c"), Err(TokenError::Malformed));
    }

    #[test]
    fn future_nbf_is_not_yet_valid() -> Result<()> {
        let tokens = service();
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({
                "sub": "user-1",
                "role": "hr",
                "email": "a@b.c",
                "full_name": "A B",
                "iat": now,
                "nbf": now + 600,
                "exp": now + TOKEN_TTL_SECONDS,
            }),
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        assert_eq!(tokens.verify(&token), Err(TokenError::NotYetValid));
        Ok(())
    }

    #[test]
    fn missing_exp_is_missing_claims() -> Result<()> {
        let tokens = service();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({
                "sub": "user-1",
                "role": "hr",
                "email": "a@b.c",
                "full_name": "A B",
                "iat": Utc::now().timestamp(),
            }),
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        assert_eq!(tokens.verify(&token), Err(TokenError::MissingClaims));
        Ok(())
    }

    #[test]
    fn empty_subject_or_role_is_missing_claims() -> Result<()> {
        let tokens = service();
        let now = Utc::now().timestamp();

        let mut claims = claims_at(now, now + TOKEN_TTL_SECONDS);
        claims.sub = String::new();
        let token = tokens.sign(&claims)?;
        assert_eq!(tokens.verify(&token), Err(TokenError::MissingClaims));

        let mut claims = claims_at(now, now + TOKEN_TTL_SECONDS);
        claims.role = "   ".to_string();
        let token = tokens.sign(&claims)?;
        assert_eq!(tokens.verify(&token), Err(TokenError::MissingClaims));
        Ok(())
    }
}
