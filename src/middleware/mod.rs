/// Middleware module
///
/// Request guards and cross-cutting request handling.

mod auth_guard;

pub use auth_guard::AuthenticatedUser;
