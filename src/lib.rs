//! # Topic Registry
//!
//! An in-process publish/subscribe registry. Callers subscribe handlers to
//! named topics, publishers broadcast a value to every current subscriber of
//! a topic, and subscriptions end either explicitly or after a bounded number
//! of invocations.
//!
//! ## Core Concepts
//!
//! - **Topics**: Non-empty string keys naming a broadcast channel
//! - **Handlers**: Callables invoked synchronously, in registration order
//! - **Handles**: Opaque [`SubscriptionId`]s used to cancel one subscription
//! - **Budgets**: Optional limit on how many times a subscription fires
//!
//! ## Example
//!
//! ```
//! use topic_registry::{Handler, Registry};
//!
//! let registry: Registry<String> = Registry::new();
//!
//! let greet = Handler::new(|name: &String| println!("hello, {name}"));
//! let id = registry.subscribe("greetings", greet.clone())?;
//! registry.subscribe_once("greetings", Handler::new(|_: &String| println!("first!")))?;
//!
//! assert!(registry.publish("greetings", &"world".to_string())?);
//!
//! // Cancel by handle, or by topic and handler identity.
//! assert!(registry.unsubscribe(id));
//! assert!(!registry.unsubscribe_handler("greetings", &greet)?);
//! # Ok::<(), topic_registry::RegistryError>(())
//! ```

pub mod error;
pub mod registry;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{RegistryError, Result};
pub use registry::{Registry, RegistryConfig};
pub use subscriptions::{Handler, HandlerError};
pub use types::{Budget, RegistryStats, SubscriptionId, SubscriptionInfo};
