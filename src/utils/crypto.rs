use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(plain: &str, hashed: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hashed)?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hex HMAC-SHA256 of a payment callback body.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_payload_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let expected = sign_payload(secret, body);
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hashed = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn signature_must_match_body_and_secret() {
        let body = br#"{"course_id":"x"}"#;
        let sig = sign_payload("whsec", body);
        assert!(verify_payload_signature("whsec", body, &sig));
        assert!(verify_payload_signature("whsec", body, &sig.to_uppercase()));
        assert!(!verify_payload_signature("other", body, &sig));
        assert!(!verify_payload_signature("whsec", b"{}", &sig));
    }
}
