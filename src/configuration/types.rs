use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A host path bind-mounted into a container.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Mount {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

impl Mount {
    pub fn new(source: impl Into<String>, target: impl Into<String>, read_only: bool) -> Self {
        Mount {
            source: source.into(),
            target: target.into(),
            read_only,
        }
    }
}

/// Runtime-agnostic description of a one-shot command container.
///
/// `cmd` is handed to a POSIX shell as a single string, so pipes and
/// redirections work as written.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub image: String,
    pub cmd: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub mounts: Vec<Mount>,
}
