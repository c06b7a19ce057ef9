//! `stocksync-auth` — webhook authentication boundary.
//!
//! Decoupled from HTTP and storage: callers hand in the raw body, the
//! signature header value and the claimed store; they get back either an
//! [`AuthenticatedStore`] or a [`SignatureError`].

pub mod identity;
pub mod signature;

pub use identity::{AuthenticatedStore, authenticate};
pub use signature::{SignatureError, sign, verify};
