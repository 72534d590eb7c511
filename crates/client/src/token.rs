//! Bearer token inspection.
//!
//! The client never verifies token signatures; that is the server's job.
//! It only peeks at the JWT payload to decide whether a cached token is
//! worth presenting at all, the same check a relying page would do before
//! rendering behind a stale session.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Ways a token can fail structural decoding.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token does not have the three dot-separated JWT segments.
    #[error("token does not have three segments")]
    Segments,

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The payload decodes but is not a JSON object.
    #[error("token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    /// The `exp` claim is not representable as a timestamp.
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// The only claim the client reads.
#[derive(Deserialize)]
struct Claims {
    /// Expiry as seconds since the epoch. Absent means non-expiring.
    exp: Option<f64>,
}

/// Read the expiry claim out of a JWT without verifying it.
///
/// Returns `Ok(None)` for a structurally valid token without an `exp`
/// claim; such tokens never expire client-side. Callers treat any error
/// as an expired token: a credential we cannot even decode is not worth
/// presenting to the server.
///
/// # Errors
///
/// Returns [`TokenError`] when the token is not shaped like a JWT or its
/// expiry cannot be represented.
pub fn peek_expiry(token: &str) -> Result<Option<DateTime<Utc>>, TokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Segments);
    };

    if payload.is_empty() {
        return Err(TokenError::Segments);
    }

    // Tolerate encoders that pad; JWTs are unpadded base64url.
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: Claims = serde_json::from_slice(&decoded)?;

    match claims.exp {
        None => Ok(None),
        Some(exp) => {
            let millis = exp * 1000.0;
            if !millis.is_finite() {
                return Err(TokenError::ExpiryOutOfRange);
            }
            // The cast saturates; from_timestamp_millis rejects the extremes.
            #[allow(clippy::cast_possible_truncation)]
            let millis = millis as i64;
            DateTime::from_timestamp_millis(millis)
                .map(Some)
                .ok_or(TokenError::ExpiryOutOfRange)
        }
    }
}

/// Whether `expiry` (as returned by [`peek_expiry`]) lies in the past.
#[must_use]
pub fn is_expired(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry.is_some_and(|at| at < now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn fake_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.fakesignature")
    }

    #[test]
    fn test_reads_future_expiry() {
        let exp = Utc::now() + TimeDelta::hours(2);
        let token = fake_token(&serde_json::json!({ "sub": "7", "exp": exp.timestamp() }));

        let peeked = peek_expiry(&token).unwrap().unwrap();
        assert_eq!(peeked.timestamp(), exp.timestamp());
        assert!(!is_expired(Some(peeked), Utc::now()));
    }

    #[test]
    fn test_reads_past_expiry() {
        let exp = Utc::now() - TimeDelta::minutes(5);
        let token = fake_token(&serde_json::json!({ "exp": exp.timestamp() }));

        let peeked = peek_expiry(&token).unwrap();
        assert!(is_expired(peeked, Utc::now()));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = fake_token(&serde_json::json!({ "sub": "7" }));
        assert_eq!(peek_expiry(&token).unwrap(), None);
        assert!(!is_expired(None, Utc::now()));
    }

    #[test]
    fn test_fractional_exp_accepted() {
        let token = fake_token(&serde_json::json!({ "exp": 4_102_444_800.5 }));
        assert!(peek_expiry(&token).unwrap().is_some());
    }

    #[test]
    fn test_not_a_jwt() {
        assert!(matches!(peek_expiry("garbage"), Err(TokenError::Segments)));
        assert!(matches!(peek_expiry("a.b"), Err(TokenError::Segments)));
        assert!(matches!(
            peek_expiry("a.b.c.d"),
            Err(TokenError::Segments)
        ));
        assert!(matches!(peek_expiry("a..c"), Err(TokenError::Segments)));
    }

    #[test]
    fn test_payload_not_base64() {
        assert!(matches!(
            peek_expiry("head.!!not-base64!!.sig"),
            Err(TokenError::Encoding(_))
        ));
    }

    #[test]
    fn test_payload_not_json() {
        let body = URL_SAFE_NO_PAD.encode(b"not json at all");
        let token = format!("head.{body}.sig");
        assert!(matches!(
            peek_expiry(&token),
            Err(TokenError::Payload(_))
        ));
    }

    #[test]
    fn test_padded_payload_accepted() {
        let body = base64::engine::general_purpose::URL_SAFE
            .encode(br#"{"exp": 4102444800}"#);
        let token = format!("head.{body}.sig");
        assert!(peek_expiry(&token).unwrap().is_some());
    }

    #[test]
    fn test_huge_exp_rejected() {
        let token = fake_token(&serde_json::json!({ "exp": 1e300 }));
        assert!(matches!(
            peek_expiry(&token),
            Err(TokenError::ExpiryOutOfRange)
        ));
    }
}
