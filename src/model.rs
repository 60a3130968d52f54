use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A comment block extracted from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub file: PathBuf,
    pub line: usize, // 1-based start line
    pub data: Vec<u8>,
}

/// Caller-supplied description of one group of source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Files, directories or glob patterns, in order
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Language identifier, e.g. "go", "rust"
    pub lang: String,

    /// Character encoding label (WHATWG names, e.g. "gbk"). UTF-8 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Walk directories recursively
    #[serde(default)]
    pub recursive: bool,

    /// Extensions to pick up from directories; the language defaults when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exts: Vec<String>,
}

impl InputSpec {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.exts.push(ext.into());
        self
    }
}

/// Tunables of the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Blocks buffered in the output stream before workers wait
    pub channel_capacity: usize,

    /// Files read, decoded and lexed at the same time
    pub max_concurrent_files: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 500,
            max_concurrent_files: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_spec_from_json_defaults() {
        let spec: InputSpec =
            serde_json::from_str(r#"{"lang": "go", "paths": ["./src"]}"#).unwrap();
        assert_eq!(spec, InputSpec::new("go").with_path("./src"));
        assert!(!spec.recursive);
        assert!(spec.encoding.is_none());
    }

    #[test]
    fn test_input_spec_serialization_skips_empty() {
        let spec = InputSpec::new("rust").with_path("lib.rs");
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("encoding").is_none());
        assert!(json.get("exts").is_none());
        assert_eq!(json["recursive"], false);
    }

    #[test]
    fn test_pipeline_config_partial() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_concurrent_files": 8}"#).unwrap();
        assert_eq!(config.max_concurrent_files, 8);
        assert_eq!(config.channel_capacity, 500);
    }
}
