//! Subscription bookkeeping.
//!
//! Each topic owns a [`SubscriberList`] of subscription records in
//! registration order. A record carries its opaque id, the [`Handler`] to
//! invoke and the remaining [`Budget`](crate::Budget).
//!
//! Budgets are consumed when an invocation is claimed and refunded if the
//! handler fails. A record whose budget reached zero stays in its list until
//! the next publish to the topic finds it and prunes it.

mod handler;
mod list;

pub use handler::{Handler, HandlerError};
pub(crate) use list::{Claim, SubscriberList, Subscription};
