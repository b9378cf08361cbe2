//! Config manifest loading
//!
//! Reads a single Config object from a YAML or JSON document. Only the
//! envelope is checked here; the spec itself is left to the validator.

use crate::crd::image_registry::ImageRegistryConfig;
use crate::error::{Error, Result};
use kube::Resource;
use std::path::Path;
use tracing::debug;

/// Parse a Config manifest from text.
///
/// Documents starting with `{` are read as JSON, everything else as YAML.
pub fn parse_manifest(text: &str) -> Result<ImageRegistryConfig> {
    let value: serde_json::Value = if text.trim_start().starts_with('{') {
        serde_json::from_str(text)?
    } else {
        serde_yaml::from_str(text)?
    };

    check_envelope(&value, "apiVersion", &ImageRegistryConfig::api_version(&()))?;
    check_envelope(&value, "kind", &ImageRegistryConfig::kind(&()))?;

    let config: ImageRegistryConfig = serde_json::from_value(value)?;
    debug!(name = config.name(), "Manifest parsed");
    Ok(config)
}

/// Read and parse a Config manifest from disk
pub fn read_manifest(path: impl AsRef<Path>) -> Result<ImageRegistryConfig> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_manifest(&text)
}

fn check_envelope(value: &serde_json::Value, field: &str, expected: &str) -> Result<()> {
    match value.get(field).and_then(|v| v.as_str()) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(Error::Configuration(format!(
            "{}: expected {:?}, found {:?}",
            field, expected, actual
        ))),
        None => Err(Error::Configuration(format!("{}: missing", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const YAML: &str = r#"
apiVersion: imageregistry.operator.openshift.io/v1
kind: Config
metadata:
  name: cluster
spec:
  managementState: Managed
  replicas: 2
  storage:
    s3:
      bucket: registry
      region: us-east-1
"#;

    #[test]
    fn test_parse_yaml() {
        let config = parse_manifest(YAML).unwrap();
        assert!(config.is_singleton());
        assert_eq!(config.spec.replicas, 2);
        assert_eq!(
            config.spec.storage.s3.as_ref().map(|s3| s3.bucket.as_str()),
            Some("registry")
        );
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "apiVersion": "imageregistry.operator.openshift.io/v1",
            "kind": "Config",
            "metadata": {"name": "cluster"},
            "spec": {"managementState": "Removed", "unknownField": 1}
        }"#;
        let config = parse_manifest(json).unwrap();
        assert_eq!(config.spec.management_state, "Removed");
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let text = YAML.replace("kind: Config", "kind: Deployment");
        assert_matches!(
            parse_manifest(&text),
            Err(Error::Configuration(msg)) if msg.starts_with("kind")
        );

        let text = YAML.replace("apiVersion: imageregistry.operator.openshift.io/v1\n", "");
        assert_matches!(parse_manifest(&text), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_malformed_documents() {
        assert_matches!(parse_manifest("{not json"), Err(Error::JsonParse(_)));
        assert_matches!(parse_manifest("spec: [unclosed"), Err(Error::YamlParse(_)));
    }

    #[test]
    fn test_read_manifest_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let config = read_manifest(file.path()).unwrap();
        assert_eq!(config.name(), "cluster");

        assert_matches!(
            read_manifest(file.path().with_extension("missing")),
            Err(Error::Io(_))
        );
    }
}
