use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    backend::spartan::DEFAULT_CONTRACT_NAME, error::TicketError,
    exporter::VERIFIER_ARTIFACT_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketConfig {
    /// Where the verifier contract is written.
    pub artifact_path: String,
    pub contract_name: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            artifact_path: VERIFIER_ARTIFACT_NAME.to_owned(),
            contract_name: DEFAULT_CONTRACT_NAME.to_owned(),
        }
    }
}

impl TicketConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TicketError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            TicketError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
            .map_err(|err| TicketError::Config(format!("{}: {err}", path.display())))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
