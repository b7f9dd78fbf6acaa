/// Authentication module
///
/// Token codec, password hashing, refresh token digests, and the service
/// implementing the token lifecycle on top of a `UserStore`.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::verify_password;
pub use refresh_token::hash_token;
pub use refresh_token::matches_stored;
pub use service::AuthService;
pub use service::IssuedTokens;
