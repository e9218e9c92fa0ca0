use crate::constants::{DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH, TREE_DEPTH_ENV};
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};

/// Registry parameters fixed at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { tree_depth: DEFAULT_TREE_DEPTH }
    }
}

impl RegistryConfig {
    pub fn new(tree_depth: usize) -> Result<Self, RegistryError> {
        let cfg = Self { tree_depth };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `REGISTRY_TREE_DEPTH`, falling back to the default depth when unset.
    pub fn from_env() -> Result<Self, RegistryError> {
        match std::env::var(TREE_DEPTH_ENV) {
            Ok(raw) => Self::from_depth_str(&raw),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(RegistryError::Config(format!("{TREE_DEPTH_ENV}: {e}"))),
        }
    }

    fn from_depth_str(raw: &str) -> Result<Self, RegistryError> {
        let depth = raw
            .trim()
            .parse::<usize>()
            .map_err(|e| RegistryError::Config(format!("{TREE_DEPTH_ENV}={raw:?}: {e}")))?;
        Self::new(depth)
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        validate_depth(self.tree_depth)
    }
}

/// Depth must lie in `1..=MAX_TREE_DEPTH`; [`crate::constants::capacity`] relies on it.
pub fn validate_depth(depth: usize) -> Result<(), RegistryError> {
    if depth == 0 || depth > MAX_TREE_DEPTH {
        return Err(RegistryError::InvalidDepth { depth, max: MAX_TREE_DEPTH });
    }
    Ok(())
}
