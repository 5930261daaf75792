use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_staff(&self) -> bool {
        self.role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case("staff"))
            .unwrap_or(false)
    }
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp() as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Opaque reference handed to the payment gateway.
pub fn generate_payment_reference() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("pay_{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_with_role() {
        let id = Uuid::new_v4();
        let token = issue_token("secret", id, "staff", Duration::hours(1)).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.user_id(), Some(id));
        assert!(claims.is_staff());
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("secret", Uuid::new_v4(), "student", Duration::hours(-2)).unwrap();
        assert!(decode_token("secret", &token).is_err());
    }

    #[test]
    fn payment_reference_shape() {
        let r = generate_payment_reference();
        assert!(r.starts_with("pay_"));
        assert_eq!(r.len(), 20);
    }
}
