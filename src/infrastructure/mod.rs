//! Infrastructure layer
//!
//! Configuration, logging, and the trait boundaries for external
//! collaborators (queue, notification, blob store, datastore). The
//! collaborator SDKs themselves live outside this crate; only their
//! contracts are defined here.

mod clients;
mod config;
mod logging;

pub use clients::{BlobStore, Datastore, NotificationClient, QueueClient, QueueMessage};
pub use config::{Config, ConfigError};
pub use logging::init_logging;
