//! Operation modes of the node.

use serde::{Deserialize, Serialize};

/// Every mode the node can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationMode {
    Retrieve,
    RetrieveAsTool,
    Load,
    Insert,
    Update,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Retrieve => "retrieve",
            OperationMode::RetrieveAsTool => "retrieve-as-tool",
            OperationMode::Load => "load",
            OperationMode::Insert => "insert",
            OperationMode::Update => "update",
        }
    }
}

impl std::str::FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retrieve" => Ok(OperationMode::Retrieve),
            "retrieve-as-tool" => Ok(OperationMode::RetrieveAsTool),
            "load" => Ok(OperationMode::Load),
            "insert" => Ok(OperationMode::Insert),
            "update" => Ok(OperationMode::Update),
            _ => Err(format!("unknown operation mode: {}", s)),
        }
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Modes valid on the direct execution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteMode {
    Load,
    Insert,
    Update,
}

impl ExecuteMode {
    pub const UNSUPPORTED: &'static str =
        r#"Only the "load", "update" and "insert" operation modes are supported with execute"#;
}

impl TryFrom<OperationMode> for ExecuteMode {
    type Error = OperationMode;

    fn try_from(mode: OperationMode) -> Result<Self, Self::Error> {
        match mode {
            OperationMode::Load => Ok(ExecuteMode::Load),
            OperationMode::Insert => Ok(ExecuteMode::Insert),
            OperationMode::Update => Ok(ExecuteMode::Update),
            other => Err(other),
        }
    }
}

/// Modes valid on the data-supply path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplyMode {
    Retrieve,
    RetrieveAsTool,
}

impl SupplyMode {
    pub const UNSUPPORTED: &'static str = r#"Only the "retrieve" and "retrieve-as-tool" operation modes are supported to supply data"#;
}

impl TryFrom<OperationMode> for SupplyMode {
    type Error = OperationMode;

    fn try_from(mode: OperationMode) -> Result<Self, Self::Error> {
        match mode {
            OperationMode::Retrieve => Ok(SupplyMode::Retrieve),
            OperationMode::RetrieveAsTool => Ok(SupplyMode::RetrieveAsTool),
            other => Err(other),
        }
    }
}
