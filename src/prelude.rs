//! Prelude module for common imports

// Re-export build pipeline types with full paths
pub use crate::build::errors::BuildError;
pub use crate::build::{
    BuildPipeline, BuildRequest, ContainerArtifact, FunctionBuilder, FunctionRecord, Workspace,
};

// Re-export worker types
pub use crate::worker::{BuildEvent, BuildStatus, Worker, WorkerSettings};

// Re-export provider types
pub use crate::provider::{
    FnProvider, FnProjectGateway, ProviderError, ProviderFunction, ProviderRegistry, Runtime,
};

// Re-export executor and infrastructure types
pub use crate::executor::{CommandRunner, RunOptions, RunOutput, ShellRunner};
pub use crate::infrastructure::{
    BlobStore, Config, ConfigError, Datastore, NotificationClient, QueueClient, QueueMessage,
};
pub use crate::registry::ContainerHostResolver;
