//! Auto-ID Keys – public API facade

pub mod asn1;
pub mod auto_id;
pub mod certificate;
pub mod config;
pub mod error;
pub mod keys;
pub mod registry;
pub mod revocation;

pub use error::{KeyError, Result, Stage};

pub use config::IdentityConfig;

pub use keys::{
    pem_public_from_private_key, public_keys_equal, verify, KeyAlgorithm, KeyPair, PublicKey,
    SignatureAlgorithm,
};

pub use asn1::{
    der_encode_signature_algorithm_oid, encode_algorithm_identifier, encode_oid,
    extract_signature_algorithm_oid, AlgorithmParameters, Oid,
};

pub use certificate::{
    create_csr, issue, self_issue, Certificate, CertificateBuilder, CertificateKind,
    CertificateSigningRequest,
};

pub use auto_id::{derive_identifier, AutoId};

pub use revocation::{
    CertificateRecord, CertificateStatus, DeactivationRequest, RegistrationRequest,
    RevocationReason, RevocationRequest, SignatureEnvelope,
};

pub use registry::{InMemoryRegistry, Receipt, RegistryAdapter};
