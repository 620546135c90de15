use std::path::Path;

use thiserror::Error;

use super::types::StackSpec;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("cannot read stack spec {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid stack spec: {0}")]
    Parse(String),

    #[error("unsupported stack spec format: {0} (expected .toml or .json)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Toml,
    Json,
}

impl SpecFormat {
    pub fn from_path(path: &Path) -> Result<Self, SpecError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(SpecError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn parse_stack_spec(input: &str, format: SpecFormat) -> Result<StackSpec, SpecError> {
    match format {
        SpecFormat::Toml => {
            toml::from_str::<StackSpec>(input).map_err(|e| SpecError::Parse(e.to_string()))
        }
        SpecFormat::Json => {
            serde_json::from_str::<StackSpec>(input).map_err(|e| SpecError::Parse(e.to_string()))
        }
    }
}

/// Load a stack spec from a `.toml` or `.json` file.
///
/// Only syntax is checked here; structural validation (duplicate ids,
/// unknown dependencies, cycles) happens when the graph is built.
pub fn load_stack_spec(path: impl AsRef<Path>) -> Result<StackSpec, SpecError> {
    let path = path.as_ref();
    let format = SpecFormat::from_path(path)?;
    let s = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_stack_spec(&s, format)
}
