//! Error types for the build pipeline

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that can fail a function build.
///
/// Every variant is fatal for the current build and routes the triggering
/// queue message to the dead-letter queue. Partial side effects (a pushed
/// image, a created provider entity) are not rolled back.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The function record does not exist in the datastore.
    #[error("function \"{0}\" not found in datastore")]
    FunctionNotFound(String),

    /// The extracted source archive contained no entries.
    #[error("extracted source archive is empty")]
    EmptySource,

    /// The record's entry point is not a `module:export` pair.
    #[error("entry point \"{0}\" is not a module:export pair")]
    InvalidEntryPoint(String),

    /// Installing the runtime adapter dependency failed.
    #[error("runtime dependency install failed with exit code {exit_code}")]
    DependencyInstall {
        /// Exit code reported by the install command.
        exit_code: i32,
    },

    /// The container image build failed.
    #[error("Failed to build docker image.")]
    ImageBuild,

    /// Pushing the image to the registry failed.
    #[error("Failed to push docker image.")]
    ImagePush,

    /// The provider returned no id when asked to create the app.
    #[error("provider returned no app id for \"{0}\"")]
    AppCreateFailed(String),

    /// The provider returned no entity when asked to create the function.
    #[error("provider did not create function \"{0}\"")]
    FunctionCreateFailed(String),

    /// The created provider function carries no invoke endpoint annotation.
    #[error("provider function \"{0}\" is missing an invoke endpoint annotation")]
    MissingInvokeEndpoint(String),

    /// The invoke endpoint annotation is not a parseable URL.
    #[error("invalid invoke endpoint \"{endpoint}\"")]
    InvalidInvokeEndpoint {
        /// The annotation value that failed to parse.
        endpoint: String,
        /// Parse failure detail.
        #[source]
        source: url::ParseError,
    },

    /// A provider gateway failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A datastore failure.
    #[error("datastore error: {0}")]
    Datastore(#[source] anyhow::Error),

    /// A blob storage failure.
    #[error("blob storage error: {0}")]
    Blob(#[source] anyhow::Error),

    /// Reading or unpacking the source archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
