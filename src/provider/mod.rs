//! Provider gateway
//!
//! Abstraction over a remote FaaS platform's app/function lifecycle API.
//! Gateways are selected by runtime through an enum-keyed registry; an
//! unrecognized runtime is a configuration error, never a silent default.
//!
//! Non-2xx responses from the provider are soft failures surfaced as `None`
//! so the caller decides their severity. The one hard-failure path is the
//! paginated app listing after its bounded retries are exhausted.

mod fn_project;

pub use fn_project::{
    FnProjectGateway, HttpTransport, ProviderRequest, ProviderResponse, ProviderTransport, Verb,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Annotation key carrying a function's invoke endpoint.
pub const INVOKE_ENDPOINT_ANNOTATION: &str = "fnproject.io/fn/invokeEndpoint";

/// Errors raised by provider gateways.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The runtime has no configured provider mapping.
    #[error("Runtime \"{0}\" not understood.")]
    UnknownRuntime(String),

    /// The paginated app listing failed and its retries are exhausted.
    #[error("Could not get application list from provider")]
    AppListing,

    /// A transport-level (connection) failure talking to the provider.
    #[error("provider transport error: {0}")]
    Transport(String),

    /// The provider returned a body that does not match its contract.
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Runtimes with a provider mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// Node.js functions, served by an Fn-Project-compatible provider.
    Node,
}

impl Runtime {
    /// Parses a runtime identifier, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownRuntime`] for unrecognized identifiers.
    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        match value.to_uppercase().as_str() {
            "NODE" => Ok(Self::Node),
            _ => Err(ProviderError::UnknownRuntime(value.to_string())),
        }
    }
}

/// A function entity as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFunction {
    /// Provider-assigned function id.
    pub id: String,

    /// Function name.
    #[serde(default)]
    pub name: String,

    /// Image tag the function currently points at.
    #[serde(default)]
    pub image: String,

    /// Provider annotations, including the invoke endpoint.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl ProviderFunction {
    /// Returns the invoke endpoint annotation, if present.
    #[must_use]
    pub fn invoke_endpoint(&self) -> Option<&str> {
        self.annotations
            .get(INVOKE_ENDPOINT_ANNOTATION)
            .map(String::as_str)
    }
}

/// Capability set of a FaaS provider gateway.
#[async_trait]
pub trait FnProvider: Send + Sync {
    /// Conventional app name for an account (one app per account).
    fn app_name(&self, account_id: &str) -> String {
        format!("mdsFn-{account_id}")
    }

    /// Creates an app, returning its id on HTTP 200 and `None` otherwise.
    async fn create_app(&self, name: &str) -> Result<Option<String>, ProviderError>;

    /// Finds an app id by exact name across the full paginated listing.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::AppListing`] once a failing page has
    /// exhausted its bounded retries.
    async fn find_app_id_by_name(&self, name: &str) -> Result<Option<String>, ProviderError>;

    /// Creates a function, returning the created entity on HTTP 200.
    async fn create_function(
        &self,
        name: &str,
        app_id: &str,
        image: &str,
    ) -> Result<Option<ProviderFunction>, ProviderError>;

    /// Updates a function's image, returning the updated entity on HTTP 200.
    ///
    /// `app_id` exists for interface symmetry with `create_function`; the
    /// request is keyed by `function_id` alone.
    async fn update_function(
        &self,
        function_id: &str,
        app_id: Option<&str>,
        image: &str,
    ) -> Result<Option<ProviderFunction>, ProviderError>;
}

/// Runtime-keyed registry of provider gateways.
pub struct ProviderRegistry {
    node: Arc<dyn FnProvider>,
}

impl ProviderRegistry {
    /// Creates a registry with the gateway serving Node functions.
    #[must_use]
    pub fn new(node: Arc<dyn FnProvider>) -> Self {
        Self { node }
    }

    /// Returns the gateway for a runtime identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownRuntime`] when the runtime has no
    /// provider mapping.
    pub fn for_runtime(&self, runtime: &str) -> Result<Arc<dyn FnProvider>, ProviderError> {
        match Runtime::parse(runtime)? {
            Runtime::Node => Ok(Arc::clone(&self.node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvider;

    #[async_trait]
    impl FnProvider for NullProvider {
        async fn create_app(&self, _name: &str) -> Result<Option<String>, ProviderError> {
            Ok(None)
        }

        async fn find_app_id_by_name(&self, _name: &str) -> Result<Option<String>, ProviderError> {
            Ok(None)
        }

        async fn create_function(
            &self,
            _name: &str,
            _app_id: &str,
            _image: &str,
        ) -> Result<Option<ProviderFunction>, ProviderError> {
            Ok(None)
        }

        async fn update_function(
            &self,
            _function_id: &str,
            _app_id: Option<&str>,
            _image: &str,
        ) -> Result<Option<ProviderFunction>, ProviderError> {
            Ok(None)
        }
    }

    #[test]
    fn test_runtime_parse_is_case_insensitive() {
        assert_eq!(Runtime::parse("node").unwrap(), Runtime::Node);
        assert_eq!(Runtime::parse("NODE").unwrap(), Runtime::Node);
        assert_eq!(Runtime::parse("Node").unwrap(), Runtime::Node);
    }

    #[test]
    fn test_runtime_parse_rejects_unknown() {
        let err = Runtime::parse("python").unwrap_err();
        assert_eq!(err.to_string(), "Runtime \"python\" not understood.");
    }

    #[test]
    fn test_registry_selects_node_gateway() {
        let registry = ProviderRegistry::new(Arc::new(NullProvider));
        assert!(registry.for_runtime("node").is_ok());
        assert!(registry.for_runtime("RUBY").is_err());
    }

    #[test]
    fn test_default_app_name_convention() {
        let provider = NullProvider;
        assert_eq!(provider.app_name("42"), "mdsFn-42");
    }

    #[test]
    fn test_invoke_endpoint_lookup() {
        let mut annotations = HashMap::new();
        annotations.insert(
            INVOKE_ENDPOINT_ANNOTATION.to_string(),
            "http://fn.local:8080/invoke/abc".to_string(),
        );
        let function = ProviderFunction {
            id: "f1".to_string(),
            name: String::new(),
            image: String::new(),
            annotations,
        };

        assert_eq!(
            function.invoke_endpoint(),
            Some("http://fn.local:8080/invoke/abc")
        );
    }
}
