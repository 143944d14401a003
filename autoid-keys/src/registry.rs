//! Registry Adapter contract and an in-process reference registry.
//!
//! A chain-backed adapter submits the same payloads as extrinsics and waits
//! for block inclusion. Callers sequence issuer-then-leaf registrations
//! themselves; nothing here orders independent calls.

use crate::auto_id::{self, AutoId};
use crate::certificate::Certificate;
use crate::error::{KeyError, Result};
use crate::revocation::{
    CertificateRecord, CertificateStatus, DeactivationRequest, RegistrationRequest,
    RevocationRequest,
};
use anyhow::anyhow;
use async_trait::async_trait;
use autoid_common::{Component, Logger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a registry submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub block_included: bool,
    pub block_number: u64,
    pub identifier: AutoId,
}

/// Operations a registry backend performs for the identity engine.
///
/// Transport and chain failures surface as [`KeyError::RegistryError`];
/// status-rule violations as [`KeyError::InvalidTransition`].
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    async fn submit_registration(&self, request: RegistrationRequest) -> Result<Receipt>;

    async fn submit_revocation(&self, request: RevocationRequest) -> Result<Receipt>;

    async fn submit_deactivation(&self, request: DeactivationRequest) -> Result<Receipt>;
}

#[derive(Default)]
struct RegistryState {
    records: HashMap<AutoId, CertificateRecord>,
    certificates: HashMap<AutoId, Certificate>,
    block_number: u64,
}

impl RegistryState {
    fn seal_block(&mut self, identifier: AutoId) -> Receipt {
        self.block_number += 1;
        Receipt {
            block_included: true,
            block_number: self.block_number,
            identifier,
        }
    }
}

/// Registry kept in memory; each accepted submission seals one block.
///
/// Checks signatures the way the pallet does: roots against their own key,
/// leaves against the registered issuer's certificate.
pub struct InMemoryRegistry {
    state: RwLock<RegistryState>,
    logger: Arc<Logger>,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new(Arc::new(Logger::new_root(Component::Registry, "in-memory")))
    }
}

impl InMemoryRegistry {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            logger,
        }
    }

    pub async fn record(&self, identifier: &AutoId) -> Option<CertificateRecord> {
        self.state.read().await.records.get(identifier).cloned()
    }

    pub async fn certificate(&self, identifier: &AutoId) -> Option<Certificate> {
        self.state.read().await.certificates.get(identifier).cloned()
    }

    pub async fn block_number(&self) -> u64 {
        self.state.read().await.block_number
    }

    async fn change_status(
        &self,
        identifier: AutoId,
        next: CertificateStatus,
    ) -> Result<Receipt> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(&identifier)
            .ok_or_else(|| KeyError::RegistryError(anyhow!("Auto-ID {identifier} is not registered")))?;
        record.status = record.status.transition(next)?;
        let receipt = state.seal_block(identifier);
        self.logger.info(format!(
            "Auto-ID {identifier} is now {next} (block {})",
            receipt.block_number
        ));
        Ok(receipt)
    }
}

#[async_trait]
impl RegistryAdapter for InMemoryRegistry {
    async fn submit_registration(&self, request: RegistrationRequest) -> Result<Receipt> {
        let identifier = request.identifier();
        let mut state = self.state.write().await;
        if state.records.contains_key(&identifier) {
            return Err(KeyError::RegistryError(anyhow!(
                "Auto-ID {identifier} is already registered"
            )));
        }

        let issuer = match request.issuer_identifier() {
            None => None,
            Some(issuer_id) => {
                let record = state.records.get(&issuer_id).ok_or_else(|| {
                    KeyError::RegistryError(anyhow!("issuer {issuer_id} is not registered"))
                })?;
                if record.status != CertificateStatus::Active {
                    return Err(KeyError::InvalidTransition(format!(
                        "issuer {issuer_id} is {}; it cannot vouch for new certificates",
                        record.status
                    )));
                }
                let issuer_cert = state.certificates.get(&issuer_id).ok_or_else(|| {
                    KeyError::RegistryError(anyhow!("certificate for issuer {issuer_id} is missing"))
                })?;
                Some(issuer_cert.clone())
            }
        };

        let certificate = Certificate::from_der(request.certificate_der(), issuer.as_ref())?;
        if certificate.raw_tbs_der() != request.signature().tbs_der.as_slice()
            || certificate.signature() != request.signature().value.as_slice()
        {
            return Err(KeyError::RegistryError(anyhow!(
                "signature envelope does not match the certificate"
            )));
        }
        let derived = auto_id::derive_identifier(&certificate)?;
        if derived != identifier {
            return Err(KeyError::RegistryError(anyhow!(
                "request claims Auto-ID {identifier} but the certificate derives {derived}"
            )));
        }

        state.records.insert(
            identifier,
            CertificateRecord {
                identifier,
                issuer_identifier: request.issuer_identifier(),
                status: CertificateStatus::Active,
            },
        );
        state.certificates.insert(identifier, certificate);
        let receipt = state.seal_block(identifier);
        self.logger.info(format!(
            "Registered Auto-ID {identifier} in block {}",
            receipt.block_number
        ));
        Ok(receipt)
    }

    async fn submit_revocation(&self, request: RevocationRequest) -> Result<Receipt> {
        if let Some(reason) = &request.reason {
            self.logger
                .debug(format!("Revoking {} ({reason:?})", request.identifier));
        }
        self.change_status(request.identifier, CertificateStatus::Revoked)
            .await
    }

    async fn submit_deactivation(&self, request: DeactivationRequest) -> Result<Receipt> {
        self.change_status(request.identifier, CertificateStatus::Deactivated)
            .await
    }
}
