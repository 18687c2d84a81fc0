use anyhow::{Context, Result};
use ethers_core::abi::Abi;
use ethers_core::types::Address;
use serde::Deserialize;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::BindError;

/// Truffle build artifact of the group factory, as produced by `truffle migrate`
pub const GROUP_DEPLOYER_ARTIFACT: &str = include_str!("../contracts/GroupDeployer.json");

/// Where the factory lives on one network, and how to talk to it
#[derive(Debug, Clone)]
pub struct DeploymentRecord {
    pub address: Address,
    pub abi: Rc<Abi>,
}

/// Deployment records keyed by network identifier (chain/network id string)
#[derive(Debug, Clone, Default)]
pub struct DeploymentRegistry {
    records: HashMap<String, DeploymentRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TruffleArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    abi: Abi,
    #[serde(default)]
    networks: HashMap<String, TruffleNetwork>,
}

#[derive(Deserialize)]
struct TruffleNetwork {
    address: Address,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every network record from a Truffle artifact
    pub fn from_artifact(json: &str) -> Result<Self> {
        let artifact: TruffleArtifact =
            serde_json::from_str(json).context("Failed to parse contract artifact")?;
        if artifact.networks.is_empty() {
            anyhow::bail!(
                "Artifact {} has no deployments, run the migration first",
                artifact.contract_name.as_deref().unwrap_or("<unnamed>")
            );
        }

        let abi = Rc::new(artifact.abi);
        let records = artifact
            .networks
            .into_iter()
            .map(|(id, network)| {
                (
                    id,
                    DeploymentRecord {
                        address: network.address,
                        abi: Rc::clone(&abi),
                    },
                )
            })
            .collect();

        Ok(Self { records })
    }

    pub fn insert(&mut self, network_id: impl Into<String>, record: DeploymentRecord) {
        self.records.insert(network_id.into(), record);
    }

    /// Never falls back to another network
    pub fn get(&self, network_id: &str) -> Result<&DeploymentRecord, BindError> {
        self.records
            .get(network_id)
            .ok_or_else(|| BindError::UnknownNetwork(network_id.to_string()))
    }

    pub fn network_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_artifact_loads() {
        let registry = DeploymentRegistry::from_artifact(GROUP_DEPLOYER_ARTIFACT).unwrap();
        assert_eq!(registry.network_ids(), vec!["1337"]);

        let record = registry.get("1337").unwrap();
        assert!(record.abi.function("nameToApp").is_ok());
        assert!(record.abi.function("createNewGroup").is_ok());
    }

    #[test]
    fn unknown_network_is_an_error_not_a_default() {
        let registry = DeploymentRegistry::from_artifact(GROUP_DEPLOYER_ARTIFACT).unwrap();
        assert_eq!(
            registry.get("3").unwrap_err(),
            BindError::UnknownNetwork("3".to_string())
        );
    }

    #[test]
    fn artifact_without_deployments_is_rejected() {
        let json = r#"{ "contractName": "GroupDeployer", "abi": [], "networks": {} }"#;
        let err = DeploymentRegistry::from_artifact(json).unwrap_err();
        assert!(err.to_string().contains("no deployments"));
    }
}
