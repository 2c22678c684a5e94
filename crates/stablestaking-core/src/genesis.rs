//! Genesis import/export. Only parameters are carried; ledger state starts empty.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LedgerConfig;
use crate::keeper::StakingLedger;
use crate::params::{ParamStore, Params};
use crate::{Result, StakingError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
}

impl GenesisState {
    pub fn validate(&self, config: &LedgerConfig) -> Result<()> {
        self.params.validate(config)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| StakingError::InvalidInput(format!("invalid genesis json: {e}")))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| StakingError::InvalidInput(format!("genesis encoding failed: {e}")))
    }
}

/// Build an empty ledger and its parameter store from `genesis`.
pub fn init_genesis(
    config: LedgerConfig,
    genesis: &GenesisState,
) -> Result<(StakingLedger, ParamStore)> {
    genesis.validate(&config)?;
    let params = ParamStore::new(genesis.params.clone(), &config)?;
    let ledger = StakingLedger::new(config)?;
    info!(
        supported = genesis.params.supported_tokens.len(),
        "stablestaking genesis initialized"
    );
    Ok((ledger, params))
}

pub fn export_genesis(params: &ParamStore) -> GenesisState {
    GenesisState {
        params: params.current().params.clone(),
    }
}
