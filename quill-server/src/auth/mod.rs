//! Accounts: password hashing, bearer tokens, the authenticated-user extractor

pub mod extract;
pub mod password;
pub mod token;

pub use extract::AuthUser;
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenIssuer};
