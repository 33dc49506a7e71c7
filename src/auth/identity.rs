use crate::{
    auth::JwtService,
    errors::AppResult,
    models::domain::Identity,
};

/// Source of the participant currently signed in, if any.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

/// Always answers with the identity it was built with.
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
}

impl StaticIdentityProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

/// Identity taken from a bearer token, checked once when the provider is built.
pub struct TokenIdentityProvider {
    identity: Identity,
}

impl TokenIdentityProvider {
    pub fn from_token(jwt: &JwtService, token: &str) -> AppResult<Self> {
        let claims = jwt.validate_token(token)?;
        let identity = claims.into_identity();
        log::debug!("Signed in as participant '{}'", identity.key);
        Ok(Self { identity })
    }
}

impl IdentityProvider for TokenIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        Some(self.identity.clone())
    }
}
