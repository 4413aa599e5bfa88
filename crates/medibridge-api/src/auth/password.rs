/// Password hashing and verification using Argon2id
///
/// Parameters come from [`HashingConfig`]; the defaults follow OWASP guidance
/// (64 MiB memory, 3 iterations, 4 lanes, 16-byte salt, 32-byte output).
/// Plaintext passwords are never stored or logged.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use medibridge_core::HashingConfig;
use thiserror::Error;

/// Password hashing errors
///
/// A wrong password is not an error: [`PasswordHasherService::verify`] returns
/// `Ok(false)` for it.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

const OUTPUT_LEN: usize = 32;

/// Argon2id hasher with fixed work factor
#[derive(Debug, Clone)]
pub struct PasswordHasherService {
    params: Params,
}

impl PasswordHasherService {
    pub fn new(config: &HashingConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(OUTPUT_LEN),
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a plaintext password
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - PHC string (algorithm, parameters, salt, and hash)
    /// * `Err(PasswordError)` - If hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a candidate against a stored hash in constant time
    ///
    /// The parameters embedded in the PHC string are used, so hashes created
    /// under older settings still verify.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Password matches
    /// * `Ok(false)` - Password does not match
    /// * `Err(PasswordError)` - Malformed hash or hashing subsystem failure
    pub fn verify(&self, hash: &str, candidate: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        match self.argon2().verify_password(candidate.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }
}
