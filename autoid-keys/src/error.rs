use std::fmt;
use thiserror::Error;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    KeyGeneration,
    KeyImport,
    KeyExport,
    Signing,
    Verification,
    Encoding,
    Decoding,
    CsrSignatureCheck,
    IssuerMatch,
    Derivation,
    Request,
    Configuration,
    Registry,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::KeyGeneration => "key generation",
            Stage::KeyImport => "key import",
            Stage::KeyExport => "key export",
            Stage::Signing => "signing",
            Stage::Verification => "signature verification",
            Stage::Encoding => "DER encoding",
            Stage::Decoding => "DER decoding",
            Stage::CsrSignatureCheck => "CSR signature check",
            Stage::IssuerMatch => "issuer match",
            Stage::Derivation => "Auto-ID derivation",
            Stage::Request => "request construction",
            Stage::Configuration => "configuration",
            Stage::Registry => "registry submission",
        };
        f.write_str(name)
    }
}

/// Error types for the autoid-keys crate
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("[{stage}] unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { stage: Stage, algorithm: String },

    #[error("[{stage}] signing error: {reason}")]
    SigningError { stage: Stage, reason: String },

    #[error("[key import] decryption error: {0}")]
    DecryptionError(String),

    #[error("[{stage}] malformed ASN.1: {reason}")]
    MalformedAsn1 { stage: Stage, reason: String },

    #[error("[CSR signature check] invalid CSR signature: {0}")]
    InvalidCsrSignature(String),

    #[error("[issuer match] issuer key mismatch: {0}")]
    IssuerKeyMismatch(String),

    #[error("[request construction] invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("[{stage}] invalid key format: {reason}")]
    InvalidKeyFormat { stage: Stage, reason: String },

    #[error("[{stage}] certificate error: {reason}")]
    CertificateError { stage: Stage, reason: String },

    #[error("[registry submission] invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("[configuration] {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    RegistryError(anyhow::Error),
}

impl KeyError {
    pub fn unsupported(stage: Stage, algorithm: impl Into<String>) -> Self {
        KeyError::UnsupportedAlgorithm {
            stage,
            algorithm: algorithm.into(),
        }
    }

    pub fn signing(stage: Stage, reason: impl Into<String>) -> Self {
        KeyError::SigningError {
            stage,
            reason: reason.into(),
        }
    }

    pub fn asn1(stage: Stage, reason: impl Into<String>) -> Self {
        KeyError::MalformedAsn1 {
            stage,
            reason: reason.into(),
        }
    }

    pub fn key_format(stage: Stage, reason: impl Into<String>) -> Self {
        KeyError::InvalidKeyFormat {
            stage,
            reason: reason.into(),
        }
    }

    pub fn certificate(stage: Stage, reason: impl Into<String>) -> Self {
        KeyError::CertificateError {
            stage,
            reason: reason.into(),
        }
    }

    /// Stage in which the failure happened
    pub fn stage(&self) -> Stage {
        match self {
            KeyError::UnsupportedAlgorithm { stage, .. }
            | KeyError::SigningError { stage, .. }
            | KeyError::MalformedAsn1 { stage, .. }
            | KeyError::InvalidKeyFormat { stage, .. }
            | KeyError::CertificateError { stage, .. } => *stage,
            KeyError::DecryptionError(_) => Stage::KeyImport,
            KeyError::InvalidCsrSignature(_) => Stage::CsrSignatureCheck,
            KeyError::IssuerKeyMismatch(_) => Stage::IssuerMatch,
            KeyError::InvalidIdentifier(_) => Stage::Request,
            KeyError::ConfigError(_) => Stage::Configuration,
            KeyError::IoError(_) => Stage::Configuration,
            KeyError::InvalidTransition(_) | KeyError::RegistryError(_) => Stage::Registry,
        }
    }

    /// Re-tag a stage-carrying error with the caller's stage.
    /// Errors with a fixed stage are returned unchanged.
    pub fn at(self, new_stage: Stage) -> Self {
        match self {
            KeyError::UnsupportedAlgorithm { algorithm, .. } => KeyError::UnsupportedAlgorithm {
                stage: new_stage,
                algorithm,
            },
            KeyError::SigningError { reason, .. } => KeyError::signing(new_stage, reason),
            KeyError::MalformedAsn1 { reason, .. } => KeyError::asn1(new_stage, reason),
            KeyError::InvalidKeyFormat { reason, .. } => KeyError::key_format(new_stage, reason),
            KeyError::CertificateError { reason, .. } => KeyError::certificate(new_stage, reason),
            other => other,
        }
    }
}

impl From<der::Error> for KeyError {
    fn from(err: der::Error) -> Self {
        KeyError::asn1(Stage::Decoding, err.to_string())
    }
}

impl From<spki::Error> for KeyError {
    fn from(err: spki::Error) -> Self {
        KeyError::key_format(Stage::KeyImport, err.to_string())
    }
}

impl From<pkcs8::Error> for KeyError {
    fn from(err: pkcs8::Error) -> Self {
        KeyError::key_format(Stage::KeyImport, err.to_string())
    }
}

impl From<rsa::Error> for KeyError {
    fn from(err: rsa::Error) -> Self {
        KeyError::key_format(Stage::KeyGeneration, format!("RSA error: {err}"))
    }
}

impl From<ed25519_dalek::ed25519::Error> for KeyError {
    fn from(err: ed25519_dalek::ed25519::Error) -> Self {
        KeyError::signing(Stage::Signing, err.to_string())
    }
}

/// Result type for autoid-keys operations
pub type Result<T> = std::result::Result<T, KeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_stage() {
        let err = KeyError::asn1(Stage::Derivation, "truncated length");
        assert_eq!(
            err.to_string(),
            "[Auto-ID derivation] malformed ASN.1: truncated length"
        );
        assert_eq!(err.stage(), Stage::Derivation);
    }

    #[test]
    fn at_retags_only_stage_carrying_variants() {
        let err = KeyError::asn1(Stage::Decoding, "x").at(Stage::KeyImport);
        assert_eq!(err.stage(), Stage::KeyImport);

        let fixed = KeyError::InvalidCsrSignature("x".into()).at(Stage::Signing);
        assert_eq!(fixed.stage(), Stage::CsrSignatureCheck);
    }

    #[test]
    fn foreign_der_errors_become_malformed_asn1() {
        let der_err = der::Error::from(der::ErrorKind::Length { tag: der::Tag::Sequence });
        let err: KeyError = der_err.into();
        assert!(matches!(err, KeyError::MalformedAsn1 { stage: Stage::Decoding, .. }));
        assert_eq!(err.at(Stage::Encoding).stage(), Stage::Encoding);
    }

    #[test]
    fn registry_errors_are_surfaced_unchanged() {
        let err = KeyError::RegistryError(anyhow::anyhow!("rpc connection refused"));
        assert_eq!(err.to_string(), "rpc connection refused");
    }
}
