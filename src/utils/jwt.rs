use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user id
    pub email: String,
    pub role: UserRole,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

impl Claims {
    pub fn for_user(user: &user::Model, expiration_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (now + Duration::hours(expiration_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, expiration_hours: i64) -> Claims {
        let now = Utc::now();
        Claims {
            sub: Uuid::new_v4(),
            email: "ops@ridedispatch.local".to_string(),
            role,
            exp: (now + Duration::hours(expiration_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(UserRole::Vendor, 1);
        let token = create_token(&original, "secret").unwrap();
        let decoded = verify_token(&token, "secret").unwrap();

        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.role, UserRole::Vendor);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = create_token(&claims(UserRole::SuperAdmin, 1), "secret").unwrap();

        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_token(&claims(UserRole::Admin, -2), "secret").unwrap();

        assert!(verify_token(&token, "secret").is_err());
    }
}
