//! Certificate lifecycle and the request payloads the registry consumes.
//!
//! Status only ever moves away from `Active`. Storing status and deciding who
//! may act on it is the registry's job; this module builds well-formed
//! requests and rejects malformed identifiers before anything is submitted.

use crate::asn1;
use crate::auto_id::{self, AutoId};
use crate::certificate::{Certificate, CertificateKind};
use crate::error::{KeyError, Result, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a registered certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Active,
    Revoked,
    Deactivated,
}

impl CertificateStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CertificateStatus::Active)
    }

    /// Move to `next`; only `Active -> Revoked` and `Active -> Deactivated`
    /// are permitted.
    pub fn transition(self, next: CertificateStatus) -> Result<CertificateStatus> {
        match (self, next) {
            (CertificateStatus::Active, CertificateStatus::Revoked)
            | (CertificateStatus::Active, CertificateStatus::Deactivated) => Ok(next),
            (from, to) => Err(KeyError::InvalidTransition(format!(
                "cannot move certificate from {from} to {to}"
            ))),
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CertificateStatus::Active => "active",
            CertificateStatus::Revoked => "revoked",
            CertificateStatus::Deactivated => "deactivated",
        };
        f.write_str(name)
    }
}

/// Registry-side view of a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub identifier: AutoId,
    pub issuer_identifier: Option<AutoId>,
    pub status: CertificateStatus,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// What the registry checks a registration signature against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    /// Signed TBS bytes, verbatim from the certificate
    #[serde(with = "hex_bytes")]
    pub tbs_der: Vec<u8>,
    /// `SEQUENCE { OID, NULL }` for the signature algorithm
    #[serde(with = "hex_bytes")]
    pub signature_algorithm: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl SignatureEnvelope {
    pub fn from_certificate(certificate: &Certificate) -> Result<Self> {
        let signature_algorithm =
            asn1::der_encode_signature_algorithm_oid(&certificate.signature_algorithm().oid())
                .map_err(|e| e.at(Stage::Request))?;
        Ok(Self {
            tbs_der: certificate.raw_tbs_der().to_vec(),
            signature_algorithm,
            value: certificate.signature().to_vec(),
        })
    }
}

/// Root or leaf registration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistrationRequest {
    Root {
        identifier: AutoId,
        #[serde(with = "hex_bytes")]
        certificate_der: Vec<u8>,
        signature: SignatureEnvelope,
    },
    Leaf {
        identifier: AutoId,
        issuer_identifier: AutoId,
        #[serde(with = "hex_bytes")]
        certificate_der: Vec<u8>,
        signature: SignatureEnvelope,
    },
}

impl RegistrationRequest {
    /// Build the payload for `certificate`.
    ///
    /// Issued certificates need their issuer's identifier; self-issued ones
    /// must not carry one.
    pub fn new(certificate: &Certificate, issuer_identifier: Option<AutoId>) -> Result<Self> {
        let identifier = auto_id::derive_identifier(certificate)?;
        let certificate_der = certificate.to_der().to_vec();
        let signature = SignatureEnvelope::from_certificate(certificate)?;
        match (certificate.kind(), issuer_identifier) {
            (CertificateKind::SelfIssued, None) => Ok(RegistrationRequest::Root {
                identifier,
                certificate_der,
                signature,
            }),
            (CertificateKind::Issued { .. }, Some(issuer_identifier)) => {
                Ok(RegistrationRequest::Leaf {
                    identifier,
                    issuer_identifier,
                    certificate_der,
                    signature,
                })
            }
            (CertificateKind::SelfIssued, Some(_)) => Err(KeyError::certificate(
                Stage::Request,
                "self-issued certificates are registered without an issuer",
            )),
            (CertificateKind::Issued { .. }, None) => Err(KeyError::certificate(
                Stage::Request,
                "issued certificates need the issuer's Auto-ID",
            )),
        }
    }

    pub fn identifier(&self) -> AutoId {
        match self {
            RegistrationRequest::Root { identifier, .. }
            | RegistrationRequest::Leaf { identifier, .. } => *identifier,
        }
    }

    pub fn issuer_identifier(&self) -> Option<AutoId> {
        match self {
            RegistrationRequest::Root { .. } => None,
            RegistrationRequest::Leaf {
                issuer_identifier, ..
            } => Some(*issuer_identifier),
        }
    }

    pub fn certificate_der(&self) -> &[u8] {
        match self {
            RegistrationRequest::Root {
                certificate_der, ..
            }
            | RegistrationRequest::Leaf {
                certificate_der, ..
            } => certificate_der,
        }
    }

    pub fn signature(&self) -> &SignatureEnvelope {
        match self {
            RegistrationRequest::Root { signature, .. }
            | RegistrationRequest::Leaf { signature, .. } => signature,
        }
    }
}

/// Why a certificate is being revoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RevocationReason {
    KeyCompromise,
    Superseded,
    CessationOfOperation,
    /// Another certificate claims the same identity
    ConflictingCertificate {
        #[serde(with = "hex_bytes")]
        certificate_der: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
    pub identifier: AutoId,
    pub reason: Option<RevocationReason>,
}

impl RevocationRequest {
    /// Parse `identifier` (hex, optional `0x`) into a revocation payload
    pub fn new(identifier: &str, reason: Option<RevocationReason>) -> Result<Self> {
        Ok(Self {
            identifier: identifier.parse()?,
            reason,
        })
    }

    pub fn for_identifier(identifier: AutoId, reason: Option<RevocationReason>) -> Self {
        Self { identifier, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationRequest {
    pub identifier: AutoId,
}

impl DeactivationRequest {
    pub fn new(identifier: &str) -> Result<Self> {
        Ok(Self {
            identifier: identifier.parse()?,
        })
    }

    pub fn for_identifier(identifier: AutoId) -> Self {
        Self { identifier }
    }
}
