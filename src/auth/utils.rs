use crate::{
    errors::{AppError, AppResult},
    models::domain::Identity,
};

pub fn require_owner(requester: &Identity, resource_owner: &str) -> AppResult<()> {
    if requester.key != resource_owner {
        return Err(AppError::Unauthorized(
            "You can only manage tests you created".to_string(),
        ));
    }
    Ok(())
}
