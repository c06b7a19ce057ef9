//! Typed webhook events emitted by storefronts.
//!
//! Decoding is all-or-nothing: a payload either becomes a complete
//! [`WebhookEvent`] or is rejected with a [`DecodeError`].

pub mod decode;
pub mod envelope;
pub mod event;
pub mod topic;

pub use decode::{DecodeError, decode};
pub use envelope::WebhookEnvelope;
pub use event::{LineItem, OrderPlaced, ProductUpdated, Variant, WebhookEvent};
pub use topic::WebhookTopic;
