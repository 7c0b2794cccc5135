mod password;
pub use password::{hash_password, verify_password};
mod jwt;
pub use jwt::{TOKEN_TTL_HOURS, UserClaims, generate_token, process_token};
mod error;
pub use error::{CryptError, CryptResult};
