//! HS256 bearer tokens

use arbor_config::TokenConfig;
use arbor_core::{Capability, Error, Result, TokenClaims, TokenService};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Registry name
pub const NAME: &str = "jwt";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    caps: BTreeSet<Capability>,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Issues and validates HS256 JWTs signed with a shared key
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtTokenService {
    /// Create a service signing with `key`
    pub fn new(key: &[u8], issuer: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            issuer: issuer.into(),
            lifetime,
        }
    }

    /// Create a service from the `[token]` section
    pub fn from_config(config: &TokenConfig) -> Result<Self> {
        let key = config
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("token.key is required for the jwt backend".into()))?;
        let secs = i64::try_from(config.lifetime_secs)
            .map_err(|_| Error::Config("token.lifetime_secs is too large".into()))?;

        Ok(Self::new(key.as_bytes(), &config.issuer, Duration::seconds(secs)))
    }

    fn issue_at(&self, claims: &TokenClaims, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: claims.entity_id.clone(),
            caps: claims.capabilities.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Token(format!("Failed to sign token: {e}")))
    }
}

impl TokenService for JwtTokenService {
    fn name(&self) -> &str {
        NAME
    }

    fn issue(&self, claims: &TokenClaims) -> Result<String> {
        self.issue_at(claims, Utc::now())
    }

    fn validate(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Token("token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    Error::Token("invalid issuer".to_string())
                }
                _ => Error::Token(e.to_string()),
            }
        })?;

        Ok(TokenClaims {
            entity_id: data.claims.sub,
            capabilities: data.claims.caps,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;

    fn service() -> JwtTokenService {
        JwtTokenService::new(b"test-key", "arbor-test", Duration::hours(1))
    }

    fn claims() -> TokenClaims {
        TokenClaims {
            entity_id: "alice".into(),
            capabilities: [Capability::GlobalRoot, Capability::LockEntity]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_issue_then_validate() {
        let svc = service();
        let token = svc.issue(&claims()).unwrap();
        assert_eq!(svc.validate(&token).unwrap(), claims());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let svc = service();
        let token = svc.issue(&claims()).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = TokenClaims {
            entity_id: "mallory".into(),
            capabilities: BTreeSet::new(),
        };
        let forged_token = svc.issue(&forged).unwrap();
        parts[1] = forged_token.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        assert!(matches!(svc.validate(&tampered), Err(Error::Token(_))));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = service().issue(&claims()).unwrap();
        let other = JwtTokenService::new(b"other-key", "arbor-test", Duration::hours(1));
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let token = service().issue(&claims()).unwrap();
        let other = JwtTokenService::new(b"test-key", "someone-else", Duration::hours(1));
        let err = other.validate(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token error: invalid issuer");
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service();
        let token = svc
            .issue_at(&claims(), Utc::now() - Duration::hours(3))
            .unwrap();
        let err = svc.validate(&token).unwrap_err();
        assert_eq!(err.to_string(), "Token error: token expired");
    }

    #[test]
    fn test_from_config() {
        let mut config = TokenConfig::default();
        assert!(JwtTokenService::from_config(&config).is_err());

        config.key = Some("k".into());
        let svc = JwtTokenService::from_config(&config).unwrap();
        assert_eq!(svc.issuer, "arbor");
        assert_eq!(svc.lifetime, Duration::seconds(3600));
    }
}
