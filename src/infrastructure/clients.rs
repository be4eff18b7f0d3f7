//! External collaborator contracts
//!
//! The queue, notification, blob-storage, and datastore services are owned
//! by platform SDKs outside this crate. The pipeline and worker loop only
//! depend on these traits; the daemon bootstrap supplies implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::build::FunctionRecord;

/// One message fetched from a work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned message id, used for deletion.
    pub id: String,

    /// Raw message body. Kept unparsed so a failed build can move the
    /// original payload to the dead-letter queue verbatim.
    pub body: String,
}

/// Work queue operations.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Fetches at most one message from the named queue.
    async fn fetch_message(&self, queue: &str) -> anyhow::Result<Option<QueueMessage>>;

    /// Enqueues a raw message body on the named queue.
    async fn enqueue_message(&self, queue: &str, body: &str) -> anyhow::Result<()>;

    /// Deletes a message from the named queue.
    async fn delete_message(&self, queue: &str, message_id: &str) -> anyhow::Result<()>;
}

/// Notification topic operations.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    /// Emits a JSON payload on the named topic.
    async fn emit(&self, topic: &str, payload: &serde_json::Value) -> anyhow::Result<()>;
}

/// Blob storage operations for source bundles.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Downloads `container/path` into `dest_dir` and returns the local
    /// file path.
    async fn download_file(
        &self,
        container: &str,
        path: &str,
        dest_dir: &Path,
    ) -> anyhow::Result<PathBuf>;

    /// Deletes a `container/path` entry from blob storage.
    async fn delete_path(&self, container_path: &str) -> anyhow::Result<()>;
}

/// Persistent function record store.
///
/// One connection is acquired per build and released unconditionally when
/// the build finishes, successfully or not.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Loads the function record for `function_id`, if present.
    async fn get_function(&self, function_id: &str) -> anyhow::Result<Option<FunctionRecord>>;

    /// Persists first-time registration fields onto the record.
    ///
    /// Implementations must make this a durable, majority-acknowledged
    /// write; a build is only reported complete once the registration is
    /// safely stored.
    async fn set_provider_registration(
        &self,
        function_id: &str,
        invoke_url: &str,
        func_id: &str,
    ) -> anyhow::Result<()>;

    /// Releases the connection. Called once per build, on every outcome.
    async fn release(&self) -> anyhow::Result<()>;
}
