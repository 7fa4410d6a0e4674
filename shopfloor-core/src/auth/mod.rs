/// Authentication primitives
///
/// - `password`: Argon2id hashing and verification for account credentials
/// - `token`: opaque session token generation

pub mod password;
pub mod token;
