//! Error types for Vanguard
//!
//! Every fallible operation in the core returns [`VanguardResult`]. All errors
//! implement [`UnifiedError`], which exposes a stable error code, the message,
//! optional context and a retryability hint.

mod constructors;
mod conversions;
mod types;
mod unified_error;
mod user_messages;

pub use types::{ResultExt, UnifiedError, VanguardError, VanguardResult};
pub use user_messages::{ErrorCategory, UserFriendlyError};
