//! Build domain types

use serde::{Deserialize, Serialize};

/// One build request, parsed from a queue message body.
///
/// Ephemeral: created per message and discarded after one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    /// Id of the function record to build.
    pub function_id: String,

    /// Blob container holding the source bundle.
    pub source_container: String,

    /// Path of the source zip within the container.
    pub source_path: String,
}

/// Persisted function record, owned by the external datastore.
///
/// Read once per build; mutated only on first-time registration, which sets
/// `func_id` and `invoke_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    /// Record id.
    pub id: String,

    /// Runtime identifier, e.g. `NODE`.
    pub runtime: String,

    /// `module:export` pair naming the user entry point.
    pub entry_point: String,

    /// Function name.
    pub name: String,

    /// Owning account id.
    pub account_id: String,

    /// Version used as the image tag.
    pub version: String,

    /// Provider-assigned function id; unset until first registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_id: Option<String>,

    /// Provider app id, when already known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_app_id: Option<String>,

    /// Public invoke URL; unset until first registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoke_url: Option<String>,
}

/// Describes an image that has been built and pushed.
///
/// The pushed image persists remotely; the local copy is removed before the
/// artifact is discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerArtifact {
    /// Lowercased `<registry-host><namespace>-<account>/<name>` tag prefix.
    pub tag_prefix: String,

    /// Tag version, taken from the record version.
    pub tag_version: String,

    /// Function name the artifact was built for.
    pub name: String,
}

impl ContainerArtifact {
    /// Full image reference, `<tag_prefix>:<tag_version>`.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{}:{}", self.tag_prefix, self.tag_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_request_wire_format() {
        let request: BuildRequest = serde_json::from_str(
            r#"{"functionId":"f1","sourceContainer":"c","sourcePath":"p.zip"}"#,
        )
        .unwrap();

        assert_eq!(request.function_id, "f1");
        assert_eq!(request.source_container, "c");
        assert_eq!(request.source_path, "p.zip");
    }

    #[test]
    fn test_function_record_optionals_default() {
        let record: FunctionRecord = serde_json::from_str(
            r#"{
                "id": "f1",
                "runtime": "NODE",
                "entryPoint": "index:handler",
                "name": "foo",
                "accountId": "42",
                "version": "3"
            }"#,
        )
        .unwrap();

        assert_eq!(record.func_id, None);
        assert_eq!(record.provider_app_id, None);
        assert_eq!(record.invoke_url, None);
    }

    #[test]
    fn test_artifact_image_reference() {
        let artifact = ContainerArtifact {
            tag_prefix: "mds-sf-42/foo".to_string(),
            tag_version: "3".to_string(),
            name: "foo".to_string(),
        };

        assert_eq!(artifact.image(), "mds-sf-42/foo:3");
    }
}
