//! Auto-ID derivation.
//!
//! The identifier is `SHA-256(sig_alg_envelope || subject_public_key_info)`
//! where `sig_alg_envelope` is the registry form `SEQUENCE { OID, NULL }`.
//! Serial number, validity and issuer are not part of the input, so
//! re-issuing a certificate for the same key and algorithm keeps its
//! Auto-ID. Changing this input breaks every identifier already on chain.

use crate::asn1;
use crate::certificate::Certificate;
use crate::error::{KeyError, Result, Stage};
use crate::keys::SignatureAlgorithm;
use der::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use spki::SubjectPublicKeyInfoRef;
use std::fmt;
use std::str::FromStr;

pub const AUTO_ID_LEN: usize = 32;

/// URI scheme prefix used when the identifier is embedded in SubjectAltName
pub const AUTO_ID_URI_PREFIX: &str = "autoid:auto:";

/// Registry lookup key bound to a certificate
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AutoId([u8; AUTO_ID_LEN]);

impl AutoId {
    pub fn from_bytes(bytes: [u8; AUTO_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; AUTO_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Form written into the SubjectAltName URI
    pub fn to_uri(&self) -> String {
        format!("{AUTO_ID_URI_PREFIX}{}", self.to_hex())
    }

    pub fn from_uri(uri: &str) -> Result<Self> {
        let hex_part = uri.strip_prefix(AUTO_ID_URI_PREFIX).ok_or_else(|| {
            KeyError::InvalidIdentifier(format!("'{uri}' is not an Auto-ID URI"))
        })?;
        hex_part.parse()
    }
}

impl fmt::Display for AutoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for AutoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AutoId({})", self.to_hex())
    }
}

impl FromStr for AutoId {
    type Err = KeyError;

    /// 64 hex digits, optionally prefixed with `0x`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != AUTO_ID_LEN * 2 {
            return Err(KeyError::InvalidIdentifier(format!(
                "expected {} hex digits, got {}",
                AUTO_ID_LEN * 2,
                digits.len()
            )));
        }
        let mut bytes = [0u8; AUTO_ID_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| KeyError::InvalidIdentifier(format!("'{s}': {e}")))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<&[u8]> for AutoId {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let array: [u8; AUTO_ID_LEN] = bytes.try_into().map_err(|_| {
            KeyError::InvalidIdentifier(format!(
                "expected {AUTO_ID_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl Serialize for AutoId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AutoId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Derive the identifier from its two inputs.
///
/// The SPKI must be canonical DER: it is decoded with `spki` and has to
/// re-encode to the same bytes. Any other encoding of the same key is
/// rejected rather than hashed into a second identifier.
pub fn derive_from_parts(algorithm: SignatureAlgorithm, spki_der: &[u8]) -> Result<AutoId> {
    let spki = SubjectPublicKeyInfoRef::from_der(spki_der)
        .map_err(|e| KeyError::from(e).at(Stage::Derivation))?;
    let canonical = spki
        .to_der()
        .map_err(|e| KeyError::from(e).at(Stage::Derivation))?;
    if canonical != spki_der {
        return Err(KeyError::asn1(
            Stage::Derivation,
            "SubjectPublicKeyInfo is not canonical DER",
        ));
    }

    let envelope = asn1::der_encode_signature_algorithm_oid(&algorithm.oid())
        .map_err(|e| e.at(Stage::Derivation))?;

    let mut hasher = Sha256::new();
    hasher.update(&envelope);
    hasher.update(spki_der);
    Ok(AutoId(hasher.finalize().into()))
}

/// Auto-ID of a built or imported certificate
pub fn derive_identifier(certificate: &Certificate) -> Result<AutoId> {
    derive_from_parts(
        certificate.signature_algorithm(),
        certificate.subject_public_key_der(),
    )
}
