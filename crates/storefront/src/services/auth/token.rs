//! Signed session tokens issued at login.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::TokenError;
use crate::models::Member;

/// Lifetime of a session token.
pub const TOKEN_TTL: TimeDelta = TimeDelta::hours(1);

/// Claims carried by a session token.
///
/// `name` and `role` are fixed placeholders and `iat` is always 0; existing
/// clients decode these fields, so they keep their legacy values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for `member` expiring [`TOKEN_TTL`] from now.
    #[must_use]
    pub fn for_member(member: &Member) -> Self {
        Self {
            user_id: member.id.to_string(),
            username: member.username.to_string(),
            name: "-".to_string(),
            role: "-".to_string(),
            iat: 0,
            exp: (Utc::now() + TOKEN_TTL).timestamp(),
        }
    }
}

/// Signs and verifies session tokens.
pub trait TokenIssuer: Send + Sync {
    /// Sign `claims` into a token string.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError>;

    /// Check signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` past `exp`, `TokenError::Invalid` otherwise.
    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

/// HS256 JWT issuer.
pub struct JwtTokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenIssuer {
    /// Create an issuer keyed by `secret`.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenIssuer")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use store_core::{MemberId, Username};

    use super::*;

    fn issuer() -> JwtTokenIssuer {
        JwtTokenIssuer::new(&SecretString::from("k3Y!x9#Qm2@vL7$wR4^tZ8&nB1*pD6%h"))
    }

    fn member() -> Member {
        Member {
            id: MemberId::new(12),
            channel_id: "MOBILE".to_string(),
            username: Username::parse("dewi").unwrap(),
            credential: SecretString::from("$2b$04$unused"),
            salt: "s4lt".to_string(),
            created_date: Utc::now(),
        }
    }

    #[test]
    fn test_claims_for_member() {
        let claims = SessionClaims::for_member(&member());

        assert_eq!(claims.user_id, "12");
        assert_eq!(claims.username, "dewi");
        assert_eq!(claims.name, "-");
        assert_eq!(claims.role, "-");
        assert_eq!(claims.iat, 0);

        let ttl = claims.exp - Utc::now().timestamp();
        assert!((3590..=3600).contains(&ttl));
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = issuer();
        let claims = SessionClaims::for_member(&member());

        let token = issuer.issue(&claims).unwrap();
        let verified = issuer.verify(&token).unwrap();

        assert_eq!(verified, claims);
    }

    #[test]
    fn test_verify_rejects_expired() {
        let issuer = issuer();
        let mut claims = SessionClaims::for_member(&member());
        claims.exp = Utc::now().timestamp() - 5;

        let token = issuer.issue(&claims).unwrap();

        assert!(matches!(issuer.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_verify_rejects_tampered() {
        let issuer = issuer();
        let token = issuer
            .issue(&SessionClaims::for_member(&member()))
            .unwrap();

        // Swap the payload for one claiming a different user.
        let forged = issuer
            .issue(&SessionClaims {
                user_id: "1".to_string(),
                ..SessionClaims::for_member(&member())
            })
            .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let tampered = parts.join(".");

        assert!(matches!(
            issuer.verify(&tampered),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let token = issuer()
            .issue(&SessionClaims::for_member(&member()))
            .unwrap();
        let other = JwtTokenIssuer::new(&SecretString::from("Zz9!Yy8@Xx7#Ww6$Vv5%Uu4^Tt3&Ss2*"));

        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }
}
