//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs carrying `sub`, `iat` and `exp`. Lifetime is fixed at
//! [`TOKEN_TTL_SECS`]. Validation accepts any HMAC algorithm in the header and
//! needs no I/O; time comes from an injected [`Clock`] so expiry is testable.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Identity;

pub const TOKEN_TTL_SECS: i64 = 360;

const HMAC_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token subject missing or not a string")]
    MalformedSubject,

    #[error("malformed token")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Payload of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Seconds until expiry at `now`; zero or negative once expired.
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp - now
    }
}

/// Loose view of an incoming payload, so a bad `sub` can be told apart from a
/// token that does not decode at all.
#[derive(Deserialize)]
struct IncomingClaims {
    sub: Option<serde_json::Value>,
    iat: Option<i64>,
    exp: Option<i64>,
}

/// Header as sent, with `alg` kept as a string. jsonwebtoken rejects unknown
/// names like `none` while parsing, before any signature check.
#[derive(Deserialize)]
struct IncomingHeader {
    alg: Option<String>,
}

/// Refuses any token whose header does not name an HMAC algorithm.
fn check_algorithm(token: &str) -> Result<(), TokenError> {
    let segment = token.split('.').next().unwrap_or_default();
    let raw = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    let header: IncomingHeader =
        serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

    match header.alg.as_deref() {
        Some(alg) if HMAC_ALGORITHMS.contains(&alg) => Ok(()),
        _ => Err(TokenError::BadSignature),
    }
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    /// Builds the service around the process-wide secret. An empty secret is refused.
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("token signing secret is empty; set JWT_SECRET_KEY");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // exp is checked against our own clock below
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Issues a token for `identity`, valid for [`TOKEN_TTL_SECS`] from now.
    ///
    /// The identity is not looked up; callers issue right after a successful verify.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: identity.as_str().to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies signature and expiry and returns the full payload.
    pub fn claims(&self, token: &str) -> Result<Claims, TokenError> {
        check_algorithm(token)?;

        let data = decode::<IncomingClaims>(token, &self.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;
        let incoming = data.claims;

        let exp = incoming.exp.ok_or(TokenError::Malformed)?;
        if self.clock.now() >= exp {
            return Err(TokenError::Expired);
        }

        let sub = match incoming.sub {
            Some(serde_json::Value::String(sub)) => sub,
            _ => return Err(TokenError::MalformedSubject),
        };

        Ok(Claims {
            sub,
            iat: incoming.iat.unwrap_or(exp - TOKEN_TTL_SECS),
            exp,
        })
    }

    /// Validates `token` and returns its subject.
    pub fn validate(&self, token: &str) -> Result<Identity, TokenError> {
        self.claims(token).map(|c| Identity::from(c.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    const SECRET: &str = "unit-test-secret";

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn service_at(now: i64) -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicI64::new(now)));
        (TokenService::new(SECRET, clock.clone()).unwrap(), clock)
    }

    fn sign_raw(payload: serde_json::Value, alg: Algorithm) -> String {
        encode(
            &Header::new(alg),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_validate_returns_subject() {
        let (svc, _) = service_at(1_700_000_000);
        let token = svc.issue(&Identity::from("a@x.com")).unwrap();
        assert_eq!(svc.validate(&token).unwrap(), "a@x.com");

        let claims = svc.claims(&token).unwrap();
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_000 + TOKEN_TTL_SECS);
    }

    #[test]
    fn test_token_expires_at_ttl() {
        let (svc, clock) = service_at(1_700_000_000);
        let token = svc.issue(&Identity::from("a@x.com")).unwrap();

        clock.advance(TOKEN_TTL_SECS - 1);
        assert!(svc.validate(&token).is_ok(), "still valid one second before expiry");

        clock.advance(1);
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));

        clock.advance(10_000);
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_other_secret_is_bad_signature() {
        let (svc, _) = service_at(1_700_000_000);
        let other = TokenService::new("another-secret", Arc::new(SystemClock)).unwrap();
        let token = other.issue(&Identity::from("a@x.com")).unwrap();
        assert_eq!(svc.validate(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_non_hmac_algorithm_is_bad_signature() {
        let (svc, _) = service_at(1_700_000_000);
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"a@x.com","exp":1700000360}"#);
        let token = format!("{header}.{payload}.c2lnbmF0dXJl");
        assert_eq!(svc.validate(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_unknown_or_missing_algorithm_is_bad_signature() {
        let (svc, _) = service_at(1_700_000_000);
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"a@x.com","exp":9999999999}"#);

        for header in [
            r#"{"alg":"none"}"#,
            r#"{"alg":"HS1024","typ":"JWT"}"#,
            r#"{"alg":"foo"}"#,
            r#"{"typ":"JWT"}"#,
        ] {
            let header = URL_SAFE_NO_PAD.encode(header);
            // unsigned form and a junk signature
            for token in [format!("{header}.{payload}."), format!("{header}.{payload}.c2ln")] {
                assert_eq!(svc.validate(&token), Err(TokenError::BadSignature), "{token}");
            }
        }
    }

    #[test]
    fn test_header_that_is_not_json_is_malformed() {
        let (svc, _) = service_at(1_700_000_000);
        let header = URL_SAFE_NO_PAD.encode("alg=HS256");
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"a@x.com","exp":9999999999}"#);
        assert_eq!(
            svc.validate(&format!("{header}.{payload}.c2ln")),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_other_hmac_algorithms_are_accepted() {
        let (svc, _) = service_at(1_700_000_000);
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign_raw(
                serde_json::json!({"sub": "a@x.com", "exp": 1_700_000_360}),
                alg,
            );
            assert_eq!(svc.validate(&token).unwrap(), "a@x.com");
        }
    }

    #[test]
    fn test_missing_or_non_string_subject() {
        let (svc, _) = service_at(1_700_000_000);

        let no_sub = sign_raw(serde_json::json!({"exp": 1_700_000_360}), Algorithm::HS256);
        assert_eq!(svc.validate(&no_sub), Err(TokenError::MalformedSubject));

        let numeric_sub = sign_raw(
            serde_json::json!({"sub": 42, "exp": 1_700_000_360}),
            Algorithm::HS256,
        );
        assert_eq!(svc.validate(&numeric_sub), Err(TokenError::MalformedSubject));
    }

    #[test]
    fn test_expiry_is_checked_before_subject() {
        let (svc, _) = service_at(1_700_000_000);
        let token = sign_raw(serde_json::json!({"sub": 42, "exp": 1_600_000_000}), Algorithm::HS256);
        assert_eq!(svc.validate(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_missing_exp_and_garbage_are_malformed() {
        let (svc, _) = service_at(1_700_000_000);
        let no_exp = sign_raw(serde_json::json!({"sub": "a@x.com"}), Algorithm::HS256);
        assert_eq!(svc.validate(&no_exp), Err(TokenError::Malformed));

        assert_eq!(svc.validate("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(svc.validate(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let (svc, _) = service_at(1_700_000_000);
        let token = svc.issue(&Identity::from("a@x.com")).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"sub":"admin@x.com","exp":1700000360}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(svc.validate(&tampered), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert!(TokenService::new("", Arc::new(SystemClock)).is_err());
    }
}
