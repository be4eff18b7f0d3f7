//! # fnforge - queue-driven function build worker
//!
//! fnforge turns uploaded function source bundles into running serverless
//! functions. A notification event triggers one unit of work: fetch a build
//! request from the work queue, unpack the source bundle, bake it into a
//! container image, push the image to a registry, and create or update the
//! function on a pluggable FaaS provider. First-time registrations persist
//! the provider function id and public invoke URL back onto the function
//! record.
//!
//! ## Architecture
//!
//! - [`worker`]: The event-driven loop that drains the work queue and
//!   reports terminal statuses, dead-lettering failed payloads
//! - [`build`]: The build pipeline itself, from source bundle to registered
//!   provider function
//! - [`provider`]: Runtime dispatch and the Fn-compatible provider gateway
//! - [`registry`]: Container registry host resolution with DNS caching
//! - [`executor`]: Shell command execution for the container tooling
//! - [`infrastructure`]: Configuration, logging, and the external service
//!   contracts (queue, notifications, blob storage, datastore)
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <https://www.apache.org/licenses/LICENSE-2.0>)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or <https://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod build;
pub mod executor;
pub mod infrastructure;
pub mod provider;
pub mod registry;
pub mod worker;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use build::{
    BuildError, BuildPipeline, BuildRequest, ContainerArtifact, FunctionBuilder, FunctionRecord,
    Workspace,
};
pub use executor::{CommandRunner, RunOptions, RunOutput, ShellRunner};
pub use infrastructure::{
    BlobStore, Config, ConfigError, Datastore, NotificationClient, QueueClient, QueueMessage,
    init_logging,
};
pub use provider::{
    FnProvider, FnProjectGateway, ProviderError, ProviderFunction, ProviderRegistry, Runtime,
};
pub use registry::ContainerHostResolver;
pub use worker::{BuildEvent, BuildStatus, Worker, WorkerSettings};

/// Version of the fnforge crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
