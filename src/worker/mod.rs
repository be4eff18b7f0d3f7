//! Queue-driven worker loop
//!
//! One notification event triggers at most one unit of work: fetch a single
//! message from the work queue, run the build pipeline on it, then emit the
//! terminal status. Successful builds delete the consumed source bundle and
//! the queue message; failed builds move the original message body to the
//! dead-letter queue before deleting the original, so the payload is never
//! lost and never retried on the work queue.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::build::{BuildPipeline, BuildRequest};
use crate::infrastructure::{BlobStore, NotificationClient, QueueClient, QueueMessage};

/// Terminal build statuses published on the notification topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    /// The build finished and the function is registered.
    #[serde(rename = "buildComplete")]
    Complete,

    /// The build failed and the message moved to the dead-letter queue.
    #[serde(rename = "buildFailed")]
    Failed,
}

impl BuildStatus {
    /// Parses a wire status string through the serde contract, so the
    /// `buildComplete`/`buildFailed` spellings live only on the variants.
    #[must_use]
    pub fn parse(status: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(status.to_string())).ok()
    }

    /// Whether an incoming event carrying this status is terminal and must
    /// not trigger further work. Every known status is terminal; work
    /// triggers carry none.
    #[must_use]
    pub fn is_terminal(status: Option<&str>) -> bool {
        status.and_then(Self::parse).is_some()
    }
}

/// Incoming notification event observed on the topic.
///
/// The worker publishes on the same topic it subscribes to, so its own
/// terminal notifications arrive back as events and are filtered by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    /// Correlation id echoed into terminal notifications.
    pub event_id: String,

    /// Status carried by the event, absent on work-trigger events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Queue and topic names the worker operates on.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Queue the worker fetches build requests from.
    pub work_queue: String,

    /// Queue failed message bodies are moved to.
    pub dead_letter_queue: String,

    /// Topic terminal statuses are emitted on.
    pub notification_topic: String,
}

/// Reacts to notification events by draining one work-queue message each.
pub struct Worker {
    pipeline: Arc<dyn BuildPipeline>,
    queue: Arc<dyn QueueClient>,
    notifications: Arc<dyn NotificationClient>,
    blobs: Arc<dyn BlobStore>,
    settings: WorkerSettings,
}

impl Worker {
    /// Creates a worker over the given collaborators.
    #[must_use]
    pub fn new(
        pipeline: Arc<dyn BuildPipeline>,
        queue: Arc<dyn QueueClient>,
        notifications: Arc<dyn NotificationClient>,
        blobs: Arc<dyn BlobStore>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            pipeline,
            queue,
            notifications,
            blobs,
            settings,
        }
    }

    /// Handles one notification event.
    ///
    /// Terminal-status events are ignored. Otherwise one message is fetched
    /// from the work queue and processed; an empty queue is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only when the work queue fetch itself fails. Build
    /// failures are absorbed: the message moves to the dead-letter queue and
    /// a `buildFailed` notification is emitted instead.
    pub async fn handle_event(&self, event: &BuildEvent) -> anyhow::Result<()> {
        if BuildStatus::is_terminal(event.status.as_deref()) {
            return Ok(());
        }
        tracing::debug!(event_id = %event.event_id, "Event received by worker.");

        let message = match self.queue.fetch_message(&self.settings.work_queue).await {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to obtain queue message");
                return Err(err);
            }
        };

        if let Some(message) = message {
            tracing::debug!(message_id = %message.id, "Queue item obtained by worker");
            if let Err(err) = self.process(event, &message).await {
                tracing::warn!(error = %err, "Failed to build function.");
                self.reject(event, &message).await?;
            }
        }
        Ok(())
    }

    /// Runs the pipeline for one message and performs success bookkeeping.
    async fn process(&self, event: &BuildEvent, message: &QueueMessage) -> anyhow::Result<()> {
        let request: BuildRequest = serde_json::from_str(&message.body)?;
        self.pipeline.build_function(&request).await?;

        tracing::debug!(function_id = %request.function_id, "Emitting build complete");
        self.emit_status(event, BuildStatus::Complete).await?;

        tracing::debug!("Preparing to delete queue message.");
        let container_path = format!("{}/{}", request.source_container, request.source_path);
        self.blobs.delete_path(&container_path).await?;
        self.queue
            .delete_message(&self.settings.work_queue, &message.id)
            .await?;
        tracing::debug!("Queue message deleted.");
        Ok(())
    }

    /// Moves a failed message to the dead-letter queue and reports failure.
    ///
    /// The original body is forwarded verbatim, so even an unparseable
    /// payload survives for inspection.
    async fn reject(&self, event: &BuildEvent, message: &QueueMessage) -> anyhow::Result<()> {
        self.queue
            .enqueue_message(&self.settings.dead_letter_queue, &message.body)
            .await?;
        self.queue
            .delete_message(&self.settings.work_queue, &message.id)
            .await?;
        self.emit_status(event, BuildStatus::Failed).await
    }

    async fn emit_status(&self, event: &BuildEvent, status: BuildStatus) -> anyhow::Result<()> {
        let payload = json!({
            "eventId": event.event_id,
            "status": status,
        });
        self.notifications
            .emit(&self.settings.notification_topic, &payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePipeline {
        fail: bool,
        requests: Mutex<Vec<BuildRequest>>,
    }

    impl FakePipeline {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                fail: false,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BuildPipeline for FakePipeline {
        async fn build_function(&self, request: &BuildRequest) -> Result<(), BuildError> {
            self.requests.lock().push(request.clone());
            if self.fail {
                return Err(BuildError::ImageBuild);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeQueue {
        messages: Mutex<VecDeque<QueueMessage>>,
        fetch_fails: bool,
        enqueued: Mutex<Vec<(String, String)>>,
        deleted: Mutex<Vec<(String, String)>>,
    }

    impl FakeQueue {
        fn with_message(body: &str) -> Arc<Self> {
            let queue = Self::default();
            queue.messages.lock().push_back(QueueMessage {
                id: "m1".to_string(),
                body: body.to_string(),
            });
            Arc::new(queue)
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self {
                fetch_fails: true,
                ..Self::default()
            })
        }
    }

    #[async_trait]
    impl QueueClient for FakeQueue {
        async fn fetch_message(&self, _queue: &str) -> anyhow::Result<Option<QueueMessage>> {
            if self.fetch_fails {
                anyhow::bail!("queue service unavailable");
            }
            Ok(self.messages.lock().pop_front())
        }

        async fn enqueue_message(&self, queue: &str, body: &str) -> anyhow::Result<()> {
            self.enqueued
                .lock()
                .push((queue.to_string(), body.to_string()));
            Ok(())
        }

        async fn delete_message(&self, queue: &str, message_id: &str) -> anyhow::Result<()> {
            self.deleted
                .lock()
                .push((queue.to_string(), message_id.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeNotifications {
        emitted: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl NotificationClient for FakeNotifications {
        async fn emit(&self, topic: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
            self.emitted.lock().push((topic.to_string(), payload.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeBlobs {
        deletes: Mutex<Vec<String>>,
        downloads: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for FakeBlobs {
        async fn download_file(
            &self,
            _container: &str,
            _path: &str,
            dest_dir: &Path,
        ) -> anyhow::Result<PathBuf> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            Ok(dest_dir.join("unused.zip"))
        }

        async fn delete_path(&self, container_path: &str) -> anyhow::Result<()> {
            self.deletes.lock().push(container_path.to_string());
            Ok(())
        }
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            work_queue: "fn-work".to_string(),
            dead_letter_queue: "fn-work-dlq".to_string(),
            notification_topic: "fn-events".to_string(),
        }
    }

    fn event() -> BuildEvent {
        BuildEvent {
            event_id: "e1".to_string(),
            status: None,
        }
    }

    const BODY: &str = r#"{"functionId":"f1","sourceContainer":"c","sourcePath":"p.zip"}"#;

    #[tokio::test]
    async fn test_successful_build_emits_complete_and_cleans_up() {
        let pipeline = FakePipeline::succeeding();
        let queue = FakeQueue::with_message(BODY);
        let notifications = Arc::new(FakeNotifications::default());
        let blobs = Arc::new(FakeBlobs::default());

        let worker = Worker::new(
            pipeline.clone(),
            queue.clone(),
            notifications.clone(),
            blobs.clone(),
            settings(),
        );
        worker.handle_event(&event()).await.unwrap();

        assert_eq!(pipeline.requests.lock().len(), 1);
        assert_eq!(
            *notifications.emitted.lock(),
            vec![(
                "fn-events".to_string(),
                serde_json::json!({"eventId": "e1", "status": "buildComplete"})
            )]
        );
        assert_eq!(*blobs.deletes.lock(), vec!["c/p.zip".to_string()]);
        assert_eq!(
            *queue.deleted.lock(),
            vec![("fn-work".to_string(), "m1".to_string())]
        );
        assert!(queue.enqueued.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_build_dead_letters_and_emits_failed() {
        let pipeline = FakePipeline::failing();
        let queue = FakeQueue::with_message(BODY);
        let notifications = Arc::new(FakeNotifications::default());
        let blobs = Arc::new(FakeBlobs::default());

        let worker = Worker::new(
            pipeline,
            queue.clone(),
            notifications.clone(),
            blobs.clone(),
            settings(),
        );
        worker.handle_event(&event()).await.unwrap();

        assert_eq!(
            *queue.enqueued.lock(),
            vec![("fn-work-dlq".to_string(), BODY.to_string())]
        );
        assert_eq!(
            *queue.deleted.lock(),
            vec![("fn-work".to_string(), "m1".to_string())]
        );
        assert_eq!(
            *notifications.emitted.lock(),
            vec![(
                "fn-events".to_string(),
                serde_json::json!({"eventId": "e1", "status": "buildFailed"})
            )]
        );
        // Source bundle stays for inspection.
        assert!(blobs.deletes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_body_is_dead_lettered_verbatim() {
        let pipeline = FakePipeline::succeeding();
        let queue = FakeQueue::with_message("not json");
        let notifications = Arc::new(FakeNotifications::default());
        let blobs = Arc::new(FakeBlobs::default());

        let worker = Worker::new(
            pipeline.clone(),
            queue.clone(),
            notifications,
            blobs,
            settings(),
        );
        worker.handle_event(&event()).await.unwrap();

        assert!(pipeline.requests.lock().is_empty());
        assert_eq!(
            *queue.enqueued.lock(),
            vec![("fn-work-dlq".to_string(), "not json".to_string())]
        );
    }

    #[tokio::test]
    async fn test_terminal_events_are_ignored() {
        for status in ["buildComplete", "buildFailed"] {
            let pipeline = FakePipeline::succeeding();
            let queue = FakeQueue::with_message(BODY);
            let worker = Worker::new(
                pipeline.clone(),
                queue.clone(),
                Arc::new(FakeNotifications::default()),
                Arc::new(FakeBlobs::default()),
                settings(),
            );

            let event = BuildEvent {
                event_id: "e1".to_string(),
                status: Some(status.to_string()),
            };
            worker.handle_event(&event).await.unwrap();

            assert!(pipeline.requests.lock().is_empty());
            assert_eq!(queue.messages.lock().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_empty_queue_is_a_noop() {
        let pipeline = FakePipeline::succeeding();
        let notifications = Arc::new(FakeNotifications::default());
        let worker = Worker::new(
            pipeline.clone(),
            FakeQueue::empty(),
            notifications.clone(),
            Arc::new(FakeBlobs::default()),
            settings(),
        );

        worker.handle_event(&event()).await.unwrap();

        assert!(pipeline.requests.lock().is_empty());
        assert!(notifications.emitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reraised() {
        let worker = Worker::new(
            FakePipeline::succeeding(),
            FakeQueue::broken(),
            Arc::new(FakeNotifications::default()),
            Arc::new(FakeBlobs::default()),
            settings(),
        );

        let err = worker.handle_event(&event()).await.unwrap_err();
        assert!(err.to_string().contains("queue service unavailable"));
    }

    #[test]
    fn test_event_wire_format() {
        let event: BuildEvent =
            serde_json::from_str(r#"{"eventId":"e1","status":"buildComplete"}"#).unwrap();
        assert_eq!(event.event_id, "e1");
        assert!(BuildStatus::is_terminal(event.status.as_deref()));

        let trigger: BuildEvent = serde_json::from_str(r#"{"eventId":"e2"}"#).unwrap();
        assert!(!BuildStatus::is_terminal(trigger.status.as_deref()));
    }

    #[test]
    fn test_status_parse_matches_serialized_spelling() {
        for status in [BuildStatus::Complete, BuildStatus::Failed] {
            let wire = serde_json::to_value(status).unwrap();
            let spelled = wire.as_str().unwrap();
            assert_eq!(BuildStatus::parse(spelled), Some(status));
            assert!(BuildStatus::is_terminal(Some(spelled)));
        }

        assert_eq!(BuildStatus::parse("queued"), None);
        assert!(!BuildStatus::is_terminal(Some("queued")));
    }
}
