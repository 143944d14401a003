//! Certificate builder and Auto-ID integration tests
//!
//! Covers issuance failures, multi-algorithm chains, the identifier
//! derivation policy and the frozen DER vectors the registry compares.

use autoid_common::logging::{Component, Logger};
use autoid_keys::{
    asn1, create_csr, der_encode_signature_algorithm_oid, derive_identifier, encode_oid, issue,
    self_issue, Certificate, CertificateBuilder, CertificateSigningRequest, IdentityConfig,
    KeyAlgorithm, KeyError, KeyPair, Oid, SignatureAlgorithm, Stage,
};
use std::sync::Arc;

fn builder() -> CertificateBuilder {
    let config = IdentityConfig::default()
        .with_rsa_modulus_bits(1024)
        .with_validity_days(30);
    CertificateBuilder::new(
        config,
        Arc::new(Logger::new_root(Component::Certificates, "certs-test")),
    )
    .unwrap()
}

fn pair(algorithm: KeyAlgorithm) -> KeyPair {
    builder().generate_key_pair(algorithm).unwrap()
}

#[test]
fn test_tampered_csr_signature_is_rejected() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let root = self_issue(&root_pair, "root").unwrap();
    let csr = create_csr(&pair(KeyAlgorithm::Ed25519), "leaf").unwrap();

    let mut der = csr.to_der().to_vec();
    let last = der.len() - 1;
    der[last] ^= 0x01;
    let tampered = CertificateSigningRequest::from_der(&der).unwrap();

    let err = issue(&root_pair, &root, &tampered).unwrap_err();
    assert!(matches!(err, KeyError::InvalidCsrSignature(_)));
    assert_eq!(err.stage(), Stage::CsrSignatureCheck);
}

#[test]
fn test_csr_with_tampered_subject_is_rejected() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let root = self_issue(&root_pair, "root").unwrap();
    let csr = create_csr(&pair(KeyAlgorithm::Ed25519), "leaf").unwrap();

    // "leaf" -> "leag" inside the signed request info
    let mut der = csr.to_der().to_vec();
    let pos = der.windows(4).position(|w| w == b"leaf").unwrap();
    der[pos + 3] = b'g';
    let tampered = CertificateSigningRequest::from_der(&der).unwrap();
    assert_eq!(tampered.subject_common_name(), "leag");

    assert!(matches!(
        issue(&root_pair, &root, &tampered),
        Err(KeyError::InvalidCsrSignature(_))
    ));
}

#[test]
fn test_issuer_key_mismatch() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let root = self_issue(&root_pair, "root").unwrap();
    let impostor = pair(KeyAlgorithm::Ed25519);
    let csr = create_csr(&pair(KeyAlgorithm::Ed25519), "leaf").unwrap();

    let err = issue(&impostor, &root, &csr).unwrap_err();
    assert!(matches!(err, KeyError::IssuerKeyMismatch(_)));
    assert_eq!(err.stage(), Stage::IssuerMatch);
}

#[test]
fn test_csr_check_runs_before_issuer_check() {
    let root = self_issue(&pair(KeyAlgorithm::Ed25519), "root").unwrap();
    let csr = create_csr(&pair(KeyAlgorithm::Ed25519), "leaf").unwrap();
    let mut der = csr.to_der().to_vec();
    let last = der.len() - 1;
    der[last] ^= 0x80;
    let tampered = CertificateSigningRequest::from_der(&der).unwrap();

    let err = issue(&pair(KeyAlgorithm::Ed25519), &root, &tampered).unwrap_err();
    assert!(matches!(err, KeyError::InvalidCsrSignature(_)));
}

#[test]
fn test_mixed_algorithm_chain() {
    let b = builder();
    let root_pair = pair(KeyAlgorithm::RsaPss);
    let root = b.self_issue(&root_pair, "rsa-pss root").unwrap();
    assert_eq!(root.signature_algorithm(), SignatureAlgorithm::RsaPssSha256);
    assert!(root.verify_signature().unwrap());

    let mid_pair = pair(KeyAlgorithm::RsaPkcs1v15);
    let mid = b
        .issue(&root_pair, &root, &b.create_csr(&mid_pair, "pkcs1 intermediate").unwrap())
        .unwrap();
    assert_eq!(mid.signature_algorithm(), SignatureAlgorithm::RsaPssSha256);

    let leaf_pair = pair(KeyAlgorithm::Ed25519);
    let leaf = b
        .issue(&mid_pair, &mid, &b.create_csr(&leaf_pair, "ed25519 leaf").unwrap())
        .unwrap();
    assert_eq!(leaf.signature_algorithm(), SignatureAlgorithm::RsaPkcs1v15Sha256);
    assert!(leaf.verify_signature().unwrap());

    let imported_root = Certificate::from_pem(&root.to_pem().unwrap(), None).unwrap();
    let imported_mid = Certificate::from_der(mid.to_der(), Some(&imported_root)).unwrap();
    let imported_leaf = Certificate::from_der(leaf.to_der(), Some(&imported_mid)).unwrap();
    assert_eq!(imported_leaf, leaf);
}

#[test]
fn test_import_against_wrong_issuer_fails() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let root = self_issue(&root_pair, "root").unwrap();
    let other_root = self_issue(&pair(KeyAlgorithm::Ed25519), "root").unwrap();
    let leaf = issue(
        &root_pair,
        &root,
        &create_csr(&pair(KeyAlgorithm::Ed25519), "leaf").unwrap(),
    )
    .unwrap();

    let err = Certificate::from_der(leaf.to_der(), Some(&other_root)).unwrap_err();
    assert_eq!(err.stage(), Stage::Verification);
}

#[test]
fn test_serial_number_is_excluded_from_auto_id() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let first = self_issue(&root_pair, "root").unwrap();
    let second = self_issue(&root_pair, "root").unwrap();
    assert_ne!(first.serial_number(), second.serial_number());
    assert_eq!(
        derive_identifier(&first).unwrap(),
        derive_identifier(&second).unwrap()
    );
}

#[test]
fn test_reissue_under_another_issuer_keeps_auto_id() {
    let leaf_pair = pair(KeyAlgorithm::Ed25519);
    let csr = create_csr(&leaf_pair, "leaf").unwrap();

    let a_pair = pair(KeyAlgorithm::Ed25519);
    let a = self_issue(&a_pair, "issuer-a").unwrap();
    let b_pair = pair(KeyAlgorithm::Ed25519);
    let b = self_issue(&b_pair, "issuer-b").unwrap();

    let under_a = issue(&a_pair, &a, &csr).unwrap();
    let under_b = issue(&b_pair, &b, &csr).unwrap();
    assert_eq!(
        derive_identifier(&under_a).unwrap(),
        derive_identifier(&under_b).unwrap()
    );

    // Same subject key signed with a different scheme is a different identity
    let c_pair = pair(KeyAlgorithm::RsaPkcs1v15);
    let c = builder().self_issue(&c_pair, "issuer-c").unwrap();
    let under_c = builder().issue(&c_pair, &c, &csr).unwrap();
    assert_ne!(
        derive_identifier(&under_a).unwrap(),
        derive_identifier(&under_c).unwrap()
    );
}

#[test]
fn test_certificate_matches_extracted_algorithm_oid() {
    let cert = builder().self_issue(&pair(KeyAlgorithm::RsaPkcs1v15), "root").unwrap();
    let oid = asn1::extract_signature_algorithm_oid(cert.to_der()).unwrap();
    assert_eq!(oid.to_string(), "1.2.840.113549.1.1.11");

    let spki_oid = asn1::extract_signature_algorithm_oid(cert.subject_public_key_der()).unwrap();
    assert_eq!(spki_oid.to_string(), "1.2.840.113549.1.1.1");
}

#[test]
fn test_rsa_sha256_reference_vectors() {
    let oid: Oid = "1.2.840.113549.1.1.11".parse().unwrap();
    let encoded = encode_oid(&oid).unwrap();
    assert_eq!(hex::encode(&encoded), "06092a864886f70d01010b");
    assert_eq!(asn1::decode_oid(&encoded).unwrap(), oid);
    assert_eq!(
        hex::encode(der_encode_signature_algorithm_oid(&oid).unwrap()),
        "300d06092a864886f70d01010b0500"
    );
}

#[test]
fn test_truncated_certificate_is_malformed() {
    let cert = self_issue(&pair(KeyAlgorithm::Ed25519), "root").unwrap();
    let der = cert.to_der();
    let err = Certificate::from_der(&der[..der.len() - 10], None).unwrap_err();
    assert!(matches!(err, KeyError::MalformedAsn1 { .. }));
}

/// Rebuild `tbs` with its `index`-th field's length written in long form
/// (`0x81 len`), then sign the result with `signer`.
fn resign_with_long_form_field(signer: &KeyPair, tbs: &[u8], index: usize) -> Vec<u8> {
    let mut outer = asn1::DerReader::new(tbs);
    let body = outer.read_expected(asn1::TAG_SEQUENCE).unwrap();
    let mut fields = asn1::DerReader::new(body.content);
    let mut content = Vec::new();
    let mut n = 0;
    while !fields.is_empty() {
        let field = fields.read_tlv().unwrap();
        if n == index {
            assert!(field.content.len() < 0x80);
            content.extend_from_slice(&[field.tag, 0x81, field.content.len() as u8]);
            content.extend_from_slice(field.content);
        } else {
            content.extend_from_slice(field.raw);
        }
        n += 1;
    }
    let stretched = asn1::encode_tlv(asn1::TAG_SEQUENCE, &content);
    let signature = signer.sign(&stretched).unwrap();
    let algorithm = signer.signature_algorithm().algorithm_identifier().unwrap();
    asn1::assemble_signed(&stretched, &algorithm, &signature)
}

#[test]
fn test_certificate_with_long_form_serial_length_is_malformed() {
    let root_pair = pair(KeyAlgorithm::Ed25519);
    let root = self_issue(&root_pair, "root").unwrap();

    // field 0 is the [0] version, field 1 the serial number
    let der = resign_with_long_form_field(&root_pair, root.raw_tbs_der(), 1);
    let err = Certificate::from_der(&der, None).unwrap_err();
    assert!(matches!(
        err,
        KeyError::MalformedAsn1 {
            stage: Stage::Decoding,
            ..
        }
    ));
}

#[test]
fn test_csr_with_long_form_version_length_is_malformed() {
    let leaf_pair = pair(KeyAlgorithm::Ed25519);
    let csr = create_csr(&leaf_pair, "leaf").unwrap();

    let der = resign_with_long_form_field(&leaf_pair, csr.raw_info_der(), 0);
    let err = CertificateSigningRequest::from_der(&der).unwrap_err();
    assert!(matches!(err, KeyError::MalformedAsn1 { .. }));
}
