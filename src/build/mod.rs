//! Build pipeline orchestrator
//!
//! Turns one [`BuildRequest`] into a pushed container image and a
//! registered provider function. Steps run strictly in sequence: workspace
//! acquisition, record load, source extraction, build-context preparation,
//! image build, push, local removal, provider registration. The datastore
//! connection release and workspace deletion run unconditionally at the end
//! of every build, successful or not.
//!
//! Collaborators (datastore, blob store, command runner, host resolver,
//! provider registry) are injected so each step can be exercised in
//! isolation and the container-build backend can be swapped.

pub mod errors;
pub mod templates;
mod types;
mod workspace;

pub use errors::BuildError;
pub use types::{BuildRequest, ContainerArtifact, FunctionRecord};
pub use workspace::Workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::executor::{CommandRunner, RunOptions};
use crate::infrastructure::{BlobStore, Datastore};
use crate::provider::{FnProvider, ProviderRegistry, Runtime};
use crate::registry::ContainerHostResolver;
use templates::{DOCKERFILE_NAME, ENTRY_FILE_NAME};

/// Namespace prefix for built image tags.
pub const IMAGE_NAMESPACE: &str = "mds-sf";

/// Fixed runtime-adapter dependency installed into every Node build root.
const FDK_INSTALL_COMMAND: &str = "npm install --save @fnproject/fdk";

/// Manifest file marking a Node build root.
const NODE_MANIFEST: &str = "package.json";

/// Entry point of the build pipeline, substitutable for tests.
#[async_trait]
pub trait BuildPipeline: Send + Sync {
    /// Runs the full build sequence for one request.
    async fn build_function(&self, request: &BuildRequest) -> Result<(), BuildError>;
}

/// Orchestrates the build sequence over injected collaborators.
pub struct FunctionBuilder {
    datastore: Arc<dyn Datastore>,
    blobs: Arc<dyn BlobStore>,
    runner: Arc<dyn CommandRunner>,
    resolver: Arc<ContainerHostResolver>,
    providers: Arc<ProviderRegistry>,
    public_host_override: Option<String>,
}

impl FunctionBuilder {
    /// Creates a builder over the given collaborators.
    #[must_use]
    pub fn new(
        datastore: Arc<dyn Datastore>,
        blobs: Arc<dyn BlobStore>,
        runner: Arc<dyn CommandRunner>,
        resolver: Arc<ContainerHostResolver>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            datastore,
            blobs,
            runner,
            resolver,
            providers,
            public_host_override: None,
        }
    }

    /// Sets the host used for derived invoke URLs instead of the endpoint's
    /// own host.
    #[must_use]
    pub fn with_public_host_override(mut self, host: Option<String>) -> Self {
        self.public_host_override = host;
        self
    }

    async fn run_pipeline(
        &self,
        request: &BuildRequest,
        workspace: &Workspace,
    ) -> Result<(), BuildError> {
        let record = self
            .datastore
            .get_function(&request.function_id)
            .await
            .map_err(BuildError::Datastore)?
            .ok_or_else(|| BuildError::FunctionNotFound(request.function_id.clone()))?;
        tracing::debug!(function_id = %record.id, "Function metadata fetch complete");

        let build_root = self.extract_source(request, &record, workspace).await?;
        tracing::debug!(build_root = %build_root.display(), "Source extraction complete");

        self.prepare_build_context(&build_root, &record).await?;

        let artifact = self.build_image(&build_root, &record).await?;
        tracing::debug!(image = %artifact.image(), "Container build complete.");

        self.push_image(&artifact).await?;
        self.remove_local_image(&artifact).await;

        self.register_with_provider(&record, &artifact).await
    }

    /// Downloads and unpacks the source bundle, returning the build root.
    async fn extract_source(
        &self,
        request: &BuildRequest,
        record: &FunctionRecord,
        workspace: &Workspace,
    ) -> Result<PathBuf, BuildError> {
        tracing::trace!(
            container = %request.source_container,
            path = %request.source_path,
            "downloading source bundle"
        );
        let zip_path = self
            .blobs
            .download_file(
                &request.source_container,
                &request.source_path,
                workspace.path(),
            )
            .await
            .map_err(BuildError::Blob)?;

        let archive_path = zip_path.clone();
        let dest = workspace.path().to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), BuildError> {
            let file = std::fs::File::open(&archive_path)?;
            let mut archive = zip::ZipArchive::new(file)?;
            archive.extract(&dest)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;

        tokio::fs::remove_file(&zip_path).await?;
        self.resolve_build_root(&record.runtime, workspace.path())
            .await
    }

    /// Resolves the effective build root for the record's runtime.
    async fn resolve_build_root(&self, runtime: &str, dir: &Path) -> Result<PathBuf, BuildError> {
        match Runtime::parse(runtime)? {
            Runtime::Node => self.node_build_root(dir).await,
        }
    }

    async fn node_build_root(&self, dir: &Path) -> Result<PathBuf, BuildError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }

        if names.is_empty() {
            return Err(BuildError::EmptySource);
        }
        if names.iter().any(|name| name == NODE_MANIFEST) {
            return Ok(dir.to_path_buf());
        }
        // Falling back to the first entry mirrors bundles zipped with a
        // wrapping directory; a bundle with several top-level entries and no
        // manifest is ambiguous and this picks one arbitrarily.
        Ok(dir.join(&names[0]))
    }

    /// Installs the runtime adapter and writes the generated artifacts.
    async fn prepare_build_context(
        &self,
        build_root: &Path,
        record: &FunctionRecord,
    ) -> Result<(), BuildError> {
        let install = self
            .runner
            .run(FDK_INSTALL_COMMAND, &RunOptions::new().cwd(build_root))
            .await?;
        if install.is_failure() {
            tracing::error!(
                exit_code = install.exit_code,
                stderr = %install.stderr,
                "Installing runtime adapter failed."
            );
            return Err(BuildError::DependencyInstall {
                exit_code: install.exit_code,
            });
        }
        tracing::debug!(build_root = %build_root.display(), "Installing runtime adapter successful.");

        let shim = templates::entry_point_shim(&record.entry_point)?;
        tokio::fs::write(build_root.join(ENTRY_FILE_NAME), shim).await?;

        let descriptor = templates::dockerfile(ENTRY_FILE_NAME);
        tokio::fs::write(build_root.join(DOCKERFILE_NAME), descriptor).await?;
        Ok(())
    }

    /// Builds the container image and returns the artifact description.
    async fn build_image(
        &self,
        build_root: &Path,
        record: &FunctionRecord,
    ) -> Result<ContainerArtifact, BuildError> {
        let host = self.resolver.container_host().await;
        let tag_prefix = format!(
            "{host}{IMAGE_NAMESPACE}-{}/{}",
            record.account_id, record.name
        )
        .to_lowercase();
        let artifact = ContainerArtifact {
            tag_prefix,
            tag_version: record.version.clone(),
            name: record.name.clone(),
        };

        let command = format!(
            "docker build -t {} -f {DOCKERFILE_NAME} .",
            artifact.image()
        );
        let output = self
            .runner
            .run(&command, &RunOptions::new().cwd(build_root))
            .await?;
        if output.is_failure() {
            tracing::error!(
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "Failed to build docker image"
            );
            // Dump the manifest as a diagnostic before failing.
            if let Ok(manifest) = self
                .runner
                .run(&format!("cat {NODE_MANIFEST}"), &RunOptions::new().cwd(build_root))
                .await
            {
                tracing::debug!(
                    exit_code = manifest.exit_code,
                    stdout = %manifest.stdout,
                    stderr = %manifest.stderr,
                    "Work directory output"
                );
            }
            return Err(BuildError::ImageBuild);
        }

        Ok(artifact)
    }

    async fn push_image(&self, artifact: &ContainerArtifact) -> Result<(), BuildError> {
        let output = self
            .runner
            .run(&format!("docker push {}", artifact.image()), &RunOptions::new())
            .await?;
        if output.is_failure() {
            tracing::error!(
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "Failed to push docker image"
            );
            return Err(BuildError::ImagePush);
        }
        Ok(())
    }

    /// Removes the local image copy. Best-effort: never fails the build.
    async fn remove_local_image(&self, artifact: &ContainerArtifact) {
        match self
            .runner
            .run(&format!("docker rmi {}", artifact.image()), &RunOptions::new())
            .await
        {
            Ok(output) if output.is_failure() => {
                tracing::debug!(
                    exit_code = output.exit_code,
                    image = %artifact.image(),
                    "Local image removal reported failure"
                );
            }
            Err(err) => {
                tracing::debug!(error = %err, image = %artifact.image(), "Local image removal errored");
            }
            Ok(_) => {}
        }
    }

    /// Creates or updates the provider-side function for the record.
    async fn register_with_provider(
        &self,
        record: &FunctionRecord,
        artifact: &ContainerArtifact,
    ) -> Result<(), BuildError> {
        let provider = self.providers.for_runtime(&record.runtime)?;
        let image = artifact.image();

        match &record.func_id {
            None => {
                let app_id = self.resolve_app_id(provider.as_ref(), record).await?;
                let function = provider
                    .create_function(&record.name, &app_id, &image)
                    .await?
                    .ok_or_else(|| BuildError::FunctionCreateFailed(record.name.clone()))?;
                tracing::debug!(func_id = %function.id, "Provider entity created.");

                let invoke_url = self.derive_invoke_url(&function)?;
                self.datastore
                    .set_provider_registration(&record.id, &invoke_url, &function.id)
                    .await
                    .map_err(BuildError::Datastore)?;
            }
            Some(func_id) => {
                let updated = provider
                    .update_function(func_id, record.provider_app_id.as_deref(), &image)
                    .await?;
                if updated.is_none() {
                    tracing::warn!(func_id = %func_id, "Provider did not acknowledge function update");
                }
                tracing::debug!(func_id = %func_id, "Provider entity updated.");
            }
        }
        Ok(())
    }

    /// Resolves the provider app id for the record's account.
    async fn resolve_app_id(
        &self,
        provider: &dyn FnProvider,
        record: &FunctionRecord,
    ) -> Result<String, BuildError> {
        if let Some(app_id) = &record.provider_app_id {
            return Ok(app_id.clone());
        }

        let app_name = provider.app_name(&record.account_id);
        if let Some(app_id) = provider.find_app_id_by_name(&app_name).await? {
            return Ok(app_id);
        }
        provider
            .create_app(&app_name)
            .await?
            .ok_or(BuildError::AppCreateFailed(app_name))
    }

    /// Derives the public invoke URL from the provider's endpoint annotation.
    fn derive_invoke_url(
        &self,
        function: &crate::provider::ProviderFunction,
    ) -> Result<String, BuildError> {
        let endpoint = function
            .invoke_endpoint()
            .ok_or_else(|| BuildError::MissingInvokeEndpoint(function.id.clone()))?;
        let parsed = Url::parse(endpoint).map_err(|source| BuildError::InvalidInvokeEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let host = match &self.public_host_override {
            Some(host) => host.clone(),
            None => {
                let scheme = parsed.scheme();
                let hostname = parsed.host_str().unwrap_or_default();
                match parsed.port_or_known_default() {
                    Some(port) => format!("{scheme}://{hostname}:{port}"),
                    None => format!("{scheme}://{hostname}"),
                }
            }
        };

        let path = parsed.path();
        let cleaned = path.strip_prefix('/').unwrap_or(path);
        Ok(format!("{host}/{cleaned}"))
    }
}

#[async_trait]
impl BuildPipeline for FunctionBuilder {
    async fn build_function(&self, request: &BuildRequest) -> Result<(), BuildError> {
        let workspace = Workspace::create().await?;

        let result = self.run_pipeline(request, &workspace).await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Function build logic failed.");
        }

        if let Err(err) = self.datastore.release().await {
            tracing::warn!(error = %err, "Failed to release datastore connection");
        }
        if let Err(err) = workspace.remove().await {
            tracing::warn!(error = %err, "Failed to remove workspace");
        }
        tracing::debug!("Function build complete.");

        result
    }
}
