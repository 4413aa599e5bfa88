//! Authentication module
//!
//! Cookie-based sessions with the following components:
//! - Password hashing with Argon2id
//! - Opaque session tokens, stored only as SHA-256 digests
//! - The session cookie contract
//! - Authentication service for signup, signin, and logout

pub mod cookie;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

pub use cookie::{expired_cookie, read_cookie, session_cookie};
pub use models::{Identity, IssuedSession, LoginRequest, SignupRequest, UserInfo};
pub use password::{PasswordError, PasswordHasherService};
pub use service::{AuthService, ClientInfo};
pub use token::{generate_session_token, token_digest, EntropyError};
