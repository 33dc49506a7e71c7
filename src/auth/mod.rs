pub mod claims;
pub mod identity;
pub mod jwt;
pub mod utils;

pub use claims::Claims;
pub use identity::{IdentityProvider, StaticIdentityProvider, TokenIdentityProvider};
pub use jwt::JwtService;
pub use utils::require_owner;

#[cfg(test)]
pub use identity::MockIdentityProvider;
