//! JSON Ledger Repository

use async_trait::async_trait;
use std::sync::Arc;

use super::ledger_file_name;
use crate::application::ports::{
    LedgerRepositoryPort, RepositoryError, StateLock, StateStoragePort,
};
use crate::domain::character::Ledger;
use crate::domain::voice::ProviderKind;

/// JSON Ledger Repository
pub struct JsonLedgerRepository {
    storage: Arc<dyn StateStoragePort>,
}

impl JsonLedgerRepository {
    pub fn new(storage: Arc<dyn StateStoragePort>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl LedgerRepositoryPort for JsonLedgerRepository {
    async fn load(&self, provider: ProviderKind) -> Result<Ledger, RepositoryError> {
        let name = ledger_file_name(provider);

        let Some(data) = self.storage.read(&name).await? else {
            return Ok(Ledger::empty(provider));
        };

        let ledger: Ledger =
            serde_json::from_slice(&data).map_err(|e| RepositoryError::corrupt(&name, e))?;
        ledger
            .validate(provider)
            .map_err(|e| RepositoryError::corrupt(&name, e))?;

        tracing::debug!(
            provider = %provider,
            entries = ledger.len(),
            "Ledger loaded"
        );

        Ok(ledger)
    }

    async fn save(&self, ledger: &Ledger) -> Result<(), RepositoryError> {
        let name = ledger_file_name(ledger.provider());
        let data = serde_json::to_vec_pretty(ledger)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        self.storage.write_atomic(&name, &data).await?;
        Ok(())
    }

    async fn clear(&self, provider: ProviderKind) -> Result<bool, RepositoryError> {
        Ok(self.storage.remove(&ledger_file_name(provider)).await?)
    }

    async fn lock(&self, provider: ProviderKind) -> Result<StateLock, RepositoryError> {
        Ok(self.storage.lock(&ledger_file_name(provider)).await?)
    }
}
