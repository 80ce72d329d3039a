//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. CORS
//! 5. Timeout error body (renders a timeout as the JSON error shape)
//! 6. Timeout (bounds every handler)
//!
//! # Extractors
//!
//! - [`CurrentUser`] - caller identity from `x-user-id`, falling back to the demo user

pub mod current_user;
pub mod request_id;
pub mod timeout;

pub use current_user::{CurrentUser, USER_ID_HEADER};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use timeout::timeout_error_body;
