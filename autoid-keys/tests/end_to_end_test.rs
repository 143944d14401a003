//! End-to-end identity workflow
//!
//! 1. Root key pair and self-issued certificate
//! 2. Leaf CSR and issuance under the root
//! 3. Auto-ID derivation for both
//! 4. Registration, revocation and deactivation against the reference registry

use autoid_common::logging::{Component, LogLevel, Logger, LoggingConfig};
use autoid_keys::{
    create_csr, derive_identifier, issue, public_keys_equal, self_issue, CertificateKind,
    CertificateStatus, DeactivationRequest, InMemoryRegistry, KeyAlgorithm, KeyError, KeyPair,
    RegistrationRequest, RegistryAdapter, Result, RevocationRequest,
};
use std::sync::Arc;

fn create_test_logger() -> Arc<Logger> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = LoggingConfig::new()
        .with_default_level(LogLevel::Warn)
        .with_component_level(Component::Registry, LogLevel::Debug);
    Arc::new(Logger::with_config(Component::Registry, "e2e", &config))
}

#[tokio::test]
async fn test_root_and_leaf_identity_workflow() -> Result<()> {
    println!("🚀 Starting Auto-ID workflow test");

    // ==========================================
    // Phase 1: Root identity
    // ==========================================
    let k1 = KeyPair::generate(KeyAlgorithm::Ed25519)?;
    let c1 = self_issue(&k1, "root")?;
    assert!(c1.verify_signature()?);
    assert!(k1.verify(c1.raw_tbs_der(), c1.signature())?);
    let i1 = derive_identifier(&c1)?;
    println!("   ✅ Root certificate issued, Auto-ID {i1}");

    // ==========================================
    // Phase 2: Leaf CSR and issuance
    // ==========================================
    let k2 = KeyPair::generate(KeyAlgorithm::Ed25519)?;
    let r1 = create_csr(&k2, "leaf")?;
    assert!(r1.verify_signature()?);
    assert!(k2.verify(r1.raw_info_der(), r1.signature())?);

    let c2 = issue(&k1, &c1, &r1)?;
    assert!(matches!(c2.kind(), CertificateKind::Issued { .. }));
    assert!(public_keys_equal(c2.issuer_public_key(), k1.public_key()));
    assert!(public_keys_equal(c2.subject_public_key(), k2.public_key()));
    assert_eq!(c2.issuer_common_name(), "root");
    assert!(c2.verify_signature()?);

    let i2 = derive_identifier(&c2)?;
    assert_ne!(i1, i2);
    assert_eq!(derive_identifier(&c2)?, i2);
    println!("   ✅ Leaf certificate issued, Auto-ID {i2}");

    // ==========================================
    // Phase 3: Registry lifecycle
    // ==========================================
    let registry = InMemoryRegistry::new(create_test_logger());
    let root_receipt = registry
        .submit_registration(RegistrationRequest::new(&c1, None)?)
        .await?;
    assert_eq!(root_receipt.identifier, i1);
    let leaf_receipt = registry
        .submit_registration(RegistrationRequest::new(&c2, Some(i1))?)
        .await?;
    assert!(leaf_receipt.block_number > root_receipt.block_number);

    let revoked = registry
        .submit_revocation(RevocationRequest::new(&i1.to_string(), None)?)
        .await?;
    assert!(revoked.block_included);

    let again = registry
        .submit_revocation(RevocationRequest::for_identifier(i1, None))
        .await;
    assert!(matches!(again, Err(KeyError::InvalidTransition(_))));
    let deactivate = registry
        .submit_deactivation(DeactivationRequest::for_identifier(i1))
        .await;
    assert!(matches!(deactivate, Err(KeyError::InvalidTransition(_))));

    let record = registry.record(&i1).await.expect("root record");
    assert_eq!(record.status, CertificateStatus::Revoked);
    println!("   ✅ Revocation is terminal");

    Ok(())
}

#[tokio::test]
async fn test_concurrent_root_registrations() -> Result<()> {
    let registry = Arc::new(InMemoryRegistry::new(create_test_logger()));

    let mut handles = Vec::new();
    for n in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let pair = KeyPair::generate(KeyAlgorithm::Ed25519)?;
            let cert = self_issue(&pair, &format!("root-{n}"))?;
            registry
                .submit_registration(RegistrationRequest::new(&cert, None)?)
                .await
        }));
    }

    let mut blocks = Vec::new();
    for handle in handles {
        let receipt = handle.await.expect("task panicked")?;
        blocks.push(receipt.block_number);
    }
    blocks.sort_unstable();
    assert_eq!(blocks, (1..=8).collect::<Vec<u64>>());
    assert_eq!(registry.block_number().await, 8);
    Ok(())
}
