use oci_spec::image::ImageConfiguration;
use serde::{Deserialize, Serialize};

/// Image-level facts kept alongside an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Content digest (`sha256:<hex>`) identifying the image.
    pub id: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    pub created: String,
    pub architecture: String,
    pub os: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub created: String,
    pub created_by: String,
    pub comment: Option<String>,
    pub empty_layer: bool,
}

impl HistoryEntry {
    /// The build instruction without the shell wrapper Docker records.
    pub fn command(&self) -> String {
        let created_by = self.created_by.trim();
        for prefix in ["/bin/sh -c #(nop) ", "/bin/sh -c "] {
            if let Some(command) = created_by.strip_prefix(prefix) {
                return command.trim_start().to_string();
            }
        }
        created_by.to_string()
    }
}

/// Reads the parts of an OCI image configuration this tool reports on.
/// The id is left empty; it comes from the archive index or config file name.
pub fn from_oci_config(config: &ImageConfiguration) -> ImageMetadata {
    let history = config
        .history()
        .as_ref()
        .map(|entries| {
            entries
                .iter()
                .map(|h| HistoryEntry {
                    created: h.created().clone().unwrap_or_default(),
                    created_by: h.created_by().clone().unwrap_or_default(),
                    comment: h.comment().clone(),
                    empty_layer: h.empty_layer().unwrap_or(false),
                })
                .collect()
        })
        .unwrap_or_default();

    ImageMetadata {
        id: String::new(),
        repo_tags: Vec::new(),
        created: config.created().clone().unwrap_or_default(),
        architecture: config.architecture().to_string(),
        os: config.os().to_string(),
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_strips_shell_prefix() {
        let entry = |created_by: &str| HistoryEntry {
            created: String::new(),
            created_by: created_by.to_string(),
            comment: None,
            empty_layer: false,
        };

        assert_eq!(entry("/bin/sh -c #(nop)  CMD [\"sh\"]").command(), "CMD [\"sh\"]");
        assert_eq!(entry("/bin/sh -c apk add curl").command(), "apk add curl");
        assert_eq!(entry("COPY . /app # buildkit").command(), "COPY . /app # buildkit");
    }

    #[test]
    fn test_from_oci_config() {
        let config: ImageConfiguration = serde_json::from_str(
            r#"{
                "created": "2024-05-01T10:00:00Z",
                "architecture": "amd64",
                "os": "linux",
                "rootfs": {"type": "layers", "diff_ids": []},
                "history": [
                    {"created": "2024-05-01T10:00:00Z", "created_by": "/bin/sh -c #(nop) ADD file:abc in / "},
                    {"created": "2024-05-01T10:00:01Z", "created_by": "/bin/sh -c #(nop)  ENV A=1", "empty_layer": true}
                ]
            }"#,
        )
        .unwrap();

        let metadata = from_oci_config(&config);
        assert_eq!(metadata.architecture, "amd64");
        assert_eq!(metadata.os, "linux");
        assert_eq!(metadata.history.len(), 2);
        assert!(!metadata.history[0].empty_layer);
        assert!(metadata.history[1].empty_layer);
        assert_eq!(metadata.history[1].command(), "ENV A=1");
    }
}
