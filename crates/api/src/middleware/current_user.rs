//! Caller identity extractor.
//!
//! There is no real authentication: the caller names itself with the
//! `x-user-id` header. Requests without one act as the configured demo user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use dealbook_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The HTTP header carrying the caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the user a request acts on behalf of.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> String {
///     format!("Hello, {user}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserId);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.headers.get(USER_ID_HEADER) {
            None => state.config().demo_user_id.clone(),
            Some(value) => {
                let id = value
                    .to_str()
                    .map(str::trim)
                    .map_err(|_| AppError::BadRequest(format!("{USER_ID_HEADER} must be ASCII")))?;
                if id.is_empty() {
                    return Err(AppError::BadRequest(format!(
                        "{USER_ID_HEADER} must not be empty"
                    )));
                }
                UserId::new(id)
            }
        };

        set_sentry_user(&user);
        Ok(Self(user))
    }
}
