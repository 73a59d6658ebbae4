use crate::error::AppError;
use crate::models::user::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token, the user's id.
    pub sub: i32,
    pub username: String,
    pub role: Role,
    /// Company of a manager account.
    pub company_id: Option<i32>,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

/// Signing material for issued tokens, built once from configuration.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    /// Generates a token for the given account, valid for the configured TTL.
    pub fn generate_token(
        &self,
        user_id: i32,
        username: &str,
        role: Role,
        company_id: Option<i32>,
    ) -> Result<String, AppError> {
        let expiration = chrono::Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .ok_or_else(|| AppError::InternalServerError("token expiry overflow".into()))?
            .timestamp() as usize;

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            company_id,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a token's signature and expiry and decodes its claims.
    ///
    /// Returns `AppError::Unauthorized` if the token is malformed, its
    /// signature is invalid, or it has expired.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_and_verification() {
        let keys = JwtKeys::new("test_secret_for_gen_verify", 24);
        let token = keys
            .generate_token(3, "manager_esk", Role::Manager, Some(2))
            .unwrap();
        let claims = keys.verify_token(&token).unwrap();
        assert_eq!(claims.sub, 3);
        assert_eq!(claims.username, "manager_esk");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.company_id, Some(2));
    }

    #[test]
    fn test_token_expiration() {
        let keys = JwtKeys::new("test_secret_for_expiration", 24);
        let expiration = chrono::Utc::now()
            .checked_sub_signed(chrono::Duration::hours(2))
            .unwrap()
            .timestamp() as usize;

        let claims_expired = Claims {
            sub: 2,
            username: "operator".into(),
            role: Role::Operator,
            company_id: None,
            exp: expiration,
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
        )
        .unwrap();

        match keys.verify_token(&expired_token) {
            Err(AppError::Unauthorized(msg)) => {
                assert!(msg.contains("Invalid token: ExpiredSignature"));
            }
            Ok(_) => panic!("Token should have been invalid due to expiration"),
            Err(e) => panic!("Unexpected error type for expired token: {:?}", e),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let issuer = JwtKeys::new("issuer_secret", 24);
        let verifier = JwtKeys::new("a_completely_different_secret", 24);
        let token = issuer
            .generate_token(1, "admin", Role::Admin, None)
            .unwrap();

        match verifier.verify_token(&token) {
            Err(AppError::Unauthorized(msg)) => {
                assert!(msg.contains("Invalid token: InvalidSignature"));
            }
            Ok(_) => panic!("Token should have been invalid due to signature mismatch"),
            Err(e) => panic!("Unexpected error type for invalid signature: {:?}", e),
        }
    }

    #[test]
    fn test_garbage_token() {
        let keys = JwtKeys::new("secret", 24);
        assert!(matches!(
            keys.verify_token("not-a-jwt"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
