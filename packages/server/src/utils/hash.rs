use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

/// Hash a secret (account password, team password or challenge flag) into a PHC string.
pub fn hash_secret(secret: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)?
        .to_string())
}

/// Check a secret against a stored PHC string. A mismatch is `Ok(false)`, not an error.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
