//! Manifest loading.

use crate::error::ControllerError;
use crds::ExternalIPRequest;
use serde::Deserialize;
use std::path::Path;

/// Parses every YAML document in `text` as an ExternalIPRequest.
///
/// Empty documents (e.g. a leading `---`) are skipped.
pub fn parse_manifests(text: &str) -> Result<Vec<ExternalIPRequest>, ControllerError> {
    let mut requests = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        requests.push(serde_yaml::from_value(value)?);
    }
    Ok(requests)
}

/// Reads and parses a manifest file.
pub async fn load_manifests(path: &Path) -> Result<Vec<ExternalIPRequest>, ControllerError> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_manifests(&text)
}
