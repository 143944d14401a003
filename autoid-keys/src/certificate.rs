//! Certificate builder: self-issued roots, CSRs and CSR-based issuance.
//!
//! Structures are built with `x509-cert`, encoded exactly once, signed, and
//! then wrapped without re-encoding. Reading goes through `x509-parser` plus
//! the byte-level splitter in [`crate::asn1`], so the TBS bytes a
//! [`Certificate`] carries are always the ones that were signed.

use crate::asn1;
use crate::auto_id::{self, AutoId, AUTO_ID_URI_PREFIX};
use crate::config::IdentityConfig;
use crate::error::{KeyError, Result, Stage};
use crate::keys::{self, public_keys_equal, KeyAlgorithm, KeyPair, PublicKey, SignatureAlgorithm};
use autoid_common::{Component, Logger};
use der::asn1::{GeneralizedTime, Ia5String, OctetString, SetOfVec, UtcTime};
use der::pem::LineEnding;
use der::{Any, DateTime, Decode, Encode, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, SubjectAltName, SubjectKeyIdentifier,
};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::request::CertReqInfo;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{TbsCertificate, Version};
use x509_parser::prelude::{
    FromDer, GeneralName as ParsedGeneralName, X509Certificate as ParsedCertificate,
    X509CertificationRequest, X509Name,
};
use x509_parser::time::ASN1Time;

const OID_COMMON_NAME: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("2.5.4.3");
const OID_BASIC_CONSTRAINTS: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("2.5.29.19");
const OID_SKI: const_oid::ObjectIdentifier = const_oid::ObjectIdentifier::new_unwrap("2.5.29.14");
const OID_AKI: const_oid::ObjectIdentifier = const_oid::ObjectIdentifier::new_unwrap("2.5.29.35");
const OID_SAN: const_oid::ObjectIdentifier = const_oid::ObjectIdentifier::new_unwrap("2.5.29.17");

const PEM_CERTIFICATE: &str = "CERTIFICATE";
const PEM_CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";

const SECONDS_PER_DAY: u64 = 24 * 3600;

fn encoding(err: der::Error) -> KeyError {
    KeyError::from(err).at(Stage::Encoding)
}

/// Whether a certificate vouches for itself or was signed by another identity
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateKind {
    SelfIssued,
    Issued { issuer_public_key: PublicKey },
}

/// Immutable X.509 certificate value.
///
/// `raw_tbs_der` is copied out of `der` at construction and is exactly what
/// the signature covers. Nothing re-serializes it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    kind: CertificateKind,
    serial_number: Vec<u8>,
    subject_common_name: String,
    issuer_common_name: String,
    subject_public_key: PublicKey,
    subject_public_key_der: Vec<u8>,
    signature_algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
    raw_tbs_der: Vec<u8>,
    not_before: ASN1Time,
    not_after: ASN1Time,
    embedded_auto_id: Option<AutoId>,
    der: Vec<u8>,
}

impl Certificate {
    /// Parse and verify a DER certificate.
    ///
    /// Without `issuer` the certificate must be self-issued. With `issuer`
    /// the signature must verify against the issuer's subject key.
    pub fn from_der(der: &[u8], issuer: Option<&Certificate>) -> Result<Self> {
        if let Some(issuer) = issuer {
            let parsed = parse_certificate(der)?;
            let issuer_cn = parsed_common_name(parsed.issuer(), "certificate issuer")?;
            if issuer_cn != issuer.subject_common_name {
                return Err(KeyError::certificate(
                    Stage::IssuerMatch,
                    format!(
                        "certificate names issuer '{issuer_cn}' but '{}' was supplied",
                        issuer.subject_common_name
                    ),
                ));
            }
        }
        Self::decode(der, issuer.map(|c| &c.subject_public_key))
    }

    pub fn from_pem(pem: &str, issuer: Option<&Certificate>) -> Result<Self> {
        let der = decode_pem(pem, PEM_CERTIFICATE)?;
        Self::from_der(&der, issuer)
    }

    fn decode(der: &[u8], issuer_key: Option<&PublicKey>) -> Result<Self> {
        let parts = asn1::split_signed(der)?;
        check_canonical_certificate(der)?;
        let signature_algorithm =
            SignatureAlgorithm::from_oid(&asn1::decode_oid(parts.algorithm_oid)?)?;

        let parsed = parse_certificate(der)?;
        if parsed.tbs_certificate.signature.algorithm != parsed.signature_algorithm.algorithm {
            return Err(KeyError::certificate(
                Stage::Decoding,
                "inner and outer signature algorithms differ",
            ));
        }

        let subject_public_key_der = parsed.public_key().raw.to_vec();
        let subject_public_key = PublicKey::from_spki_der(&subject_public_key_der)?;

        let kind = match issuer_key {
            Some(key) if !public_keys_equal(key, &subject_public_key) => CertificateKind::Issued {
                issuer_public_key: key.clone(),
            },
            _ => CertificateKind::SelfIssued,
        };
        let verifying_key = match &kind {
            CertificateKind::SelfIssued => &subject_public_key,
            CertificateKind::Issued { issuer_public_key } => issuer_public_key,
        };
        let valid = keys::verify(verifying_key, signature_algorithm, parts.body, parts.signature)?;
        if !valid {
            return Err(KeyError::certificate(
                Stage::Verification,
                match kind {
                    CertificateKind::SelfIssued => {
                        "signature does not verify against the subject key (issuer certificate missing?)"
                    }
                    CertificateKind::Issued { .. } => {
                        "signature does not verify against the issuer key"
                    }
                },
            ));
        }

        let embedded_auto_id = embedded_auto_id_of(&parsed)?;
        if let Some(embedded) = embedded_auto_id {
            let derived = auto_id::derive_from_parts(signature_algorithm, &subject_public_key_der)?;
            if embedded != derived {
                return Err(KeyError::certificate(
                    Stage::Derivation,
                    format!("embedded Auto-ID {embedded} does not match derived {derived}"),
                ));
            }
        }

        let validity = parsed.validity();
        Ok(Self {
            kind,
            serial_number: parsed.raw_serial().to_vec(),
            subject_common_name: parsed_common_name(parsed.subject(), "certificate subject")?,
            issuer_common_name: parsed_common_name(parsed.issuer(), "certificate issuer")?,
            subject_public_key,
            subject_public_key_der,
            signature_algorithm,
            signature: parts.signature.to_vec(),
            raw_tbs_der: parts.body.to_vec(),
            not_before: validity.not_before,
            not_after: validity.not_after,
            embedded_auto_id,
            der: der.to_vec(),
        })
    }

    pub fn kind(&self) -> &CertificateKind {
        &self.kind
    }

    pub fn is_self_issued(&self) -> bool {
        matches!(self.kind, CertificateKind::SelfIssued)
    }

    /// Big-endian serial number content octets
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn subject_common_name(&self) -> &str {
        &self.subject_common_name
    }

    pub fn issuer_common_name(&self) -> &str {
        &self.issuer_common_name
    }

    pub fn subject_public_key(&self) -> &PublicKey {
        &self.subject_public_key
    }

    /// SubjectPublicKeyInfo exactly as it appears in the certificate
    pub fn subject_public_key_der(&self) -> &[u8] {
        &self.subject_public_key_der
    }

    pub fn issuer_public_key(&self) -> &PublicKey {
        match &self.kind {
            CertificateKind::SelfIssued => &self.subject_public_key,
            CertificateKind::Issued { issuer_public_key } => issuer_public_key,
        }
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn raw_tbs_der(&self) -> &[u8] {
        &self.raw_tbs_der
    }

    pub fn not_before(&self) -> ASN1Time {
        self.not_before
    }

    pub fn not_after(&self) -> ASN1Time {
        self.not_after
    }

    /// Whether `at` lies within the validity window
    pub fn is_valid_at(&self, at: SystemTime) -> bool {
        let Ok(since_epoch) = at.duration_since(UNIX_EPOCH) else {
            return false;
        };
        let secs = since_epoch.as_secs() as i64;
        self.not_before.timestamp() <= secs && secs <= self.not_after.timestamp()
    }

    /// Auto-ID written into the SubjectAltName, if any
    pub fn embedded_auto_id(&self) -> Option<AutoId> {
        self.embedded_auto_id
    }

    /// Derive this certificate's Auto-ID
    pub fn auto_id(&self) -> Result<AutoId> {
        auto_id::derive_identifier(self)
    }

    /// Re-check the stored signature over the stored TBS bytes
    pub fn verify_signature(&self) -> Result<bool> {
        keys::verify(
            self.issuer_public_key(),
            self.signature_algorithm,
            &self.raw_tbs_der,
            &self.signature,
        )
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> Result<String> {
        der::pem::encode_string(PEM_CERTIFICATE, LineEnding::LF, &self.der)
            .map_err(|e| encoding(e.into()))
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            CertificateKind::SelfIssued => "self-issued",
            CertificateKind::Issued { .. } => "issued",
        };
        writeln!(f, "Certificate ({kind})")?;
        writeln!(f, "  Subject:     CN={}", self.subject_common_name)?;
        writeln!(f, "  Issuer:      CN={}", self.issuer_common_name)?;
        writeln!(f, "  Serial:      {}", hex::encode(&self.serial_number))?;
        writeln!(f, "  Algorithm:   {}", self.signature_algorithm)?;
        writeln!(f, "  Key type:    {}", self.subject_public_key.kind())?;
        writeln!(f, "  Not before:  {}", self.not_before)?;
        writeln!(f, "  Not after:   {}", self.not_after)?;
        match self.auto_id() {
            Ok(id) => write!(f, "  Auto-ID:     {id}"),
            Err(e) => write!(f, "  Auto-ID:     <unavailable: {e}>"),
        }
    }
}

/// PKCS#10 certification request signed by its subject
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateSigningRequest {
    subject_common_name: String,
    subject_public_key: PublicKey,
    subject_public_key_der: Vec<u8>,
    signature_algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
    raw_info_der: Vec<u8>,
    der: Vec<u8>,
}

impl CertificateSigningRequest {
    /// Parse a DER CSR. The self-signature is checked at issuance, not here.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parts = asn1::split_signed(der)?;
        let strict = x509_cert::request::CertReq::from_der(der)?;
        ensure_reencodes(&strict, der, "certification request")?;
        let signature_algorithm =
            SignatureAlgorithm::from_oid(&asn1::decode_oid(parts.algorithm_oid)?)?;

        let (_, parsed) = X509CertificationRequest::from_der(der).map_err(|e| {
            KeyError::certificate(Stage::Decoding, format!("Failed to parse CSR: {e}"))
        })?;
        let info = &parsed.certification_request_info;
        let subject_public_key_der = info.subject_pki.raw.to_vec();

        Ok(Self {
            subject_common_name: parsed_common_name(&info.subject, "CSR subject")?,
            subject_public_key: PublicKey::from_spki_der(&subject_public_key_der)?,
            subject_public_key_der,
            signature_algorithm,
            signature: parts.signature.to_vec(),
            raw_info_der: parts.body.to_vec(),
            der: der.to_vec(),
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&decode_pem(pem, PEM_CERTIFICATE_REQUEST)?)
    }

    pub fn subject_common_name(&self) -> &str {
        &self.subject_common_name
    }

    pub fn subject_public_key(&self) -> &PublicKey {
        &self.subject_public_key
    }

    pub fn subject_public_key_der(&self) -> &[u8] {
        &self.subject_public_key_der
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn raw_info_der(&self) -> &[u8] {
        &self.raw_info_der
    }

    /// Check the subject's signature over the request info
    pub fn verify_signature(&self) -> Result<bool> {
        keys::verify(
            &self.subject_public_key,
            self.signature_algorithm,
            &self.raw_info_der,
            &self.signature,
        )
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> Result<String> {
        der::pem::encode_string(PEM_CERTIFICATE_REQUEST, LineEnding::LF, &self.der)
            .map_err(|e| encoding(e.into()))
    }
}

/// Builds certificates and CSRs under one configuration
pub struct CertificateBuilder {
    config: IdentityConfig,
    logger: Arc<Logger>,
}

impl Default for CertificateBuilder {
    fn default() -> Self {
        Self {
            config: IdentityConfig::default(),
            logger: Arc::new(Logger::new_root(Component::Certificates, "autoid")),
        }
    }
}

impl CertificateBuilder {
    pub fn new(config: IdentityConfig, logger: Arc<Logger>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, logger })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Fresh key pair; RSA modulus size comes from the builder's config
    pub fn generate_key_pair(&self, algorithm: KeyAlgorithm) -> Result<KeyPair> {
        let key_pair = KeyPair::generate_with(algorithm, &self.config)?;
        self.logger
            .with_component(Component::Keys)
            .info(format!("Generated {algorithm} key pair"));
        Ok(key_pair)
    }

    /// Root certificate: subject and issuer are the same key
    pub fn self_issue(&self, key_pair: &KeyPair, common_name: &str) -> Result<Certificate> {
        let algorithm = key_pair.signature_algorithm();
        let spki_der = key_pair.public_key().to_spki_der()?;
        let spki = SubjectPublicKeyInfoOwned::from_der(&spki_der).map_err(encoding)?;
        let ski = compute_ski(&spki)?;

        let mut extensions = vec![
            extension(
                OID_BASIC_CONSTRAINTS,
                true,
                &BasicConstraints {
                    ca: true,
                    path_len_constraint: None,
                },
            )?,
            extension(OID_SKI, false, &ski)?,
            extension(
                OID_AKI,
                false,
                &AuthorityKeyIdentifier {
                    key_identifier: Some(ski.0.clone()),
                    authority_cert_issuer: None,
                    authority_cert_serial_number: None,
                },
            )?,
        ];
        if self.config.embed_auto_id {
            let id = auto_id::derive_from_parts(algorithm, &spki_der)?;
            extensions.push(auto_id_extension(&id)?);
        }

        let subject = name_from_common_name(common_name)?;
        let tbs_der = self.build_tbs(algorithm, subject.clone(), subject, spki, extensions)?;
        let der = sign_into_certificate(key_pair, &tbs_der)?;
        let certificate = Certificate::decode(&der, None)?;

        self.logger.info(format!(
            "Self-issued certificate for '{common_name}' ({algorithm}, serial {})",
            hex::encode(certificate.serial_number())
        ));
        Ok(certificate)
    }

    /// Subject-signed request over its name and public key
    pub fn create_csr(
        &self,
        key_pair: &KeyPair,
        common_name: &str,
    ) -> Result<CertificateSigningRequest> {
        let algorithm = key_pair.signature_algorithm();
        let spki_der = key_pair.public_key().to_spki_der()?;
        let info = CertReqInfo {
            version: x509_cert::request::Version::V1,
            subject: name_from_common_name(common_name)?,
            public_key: SubjectPublicKeyInfoOwned::from_der(&spki_der).map_err(encoding)?,
            attributes: SetOfVec::new(),
        };
        let info_der = info.to_der().map_err(encoding)?;
        let signature = key_pair.sign(&info_der)?;
        let der = asn1::assemble_signed(&info_der, &algorithm.algorithm_identifier()?, &signature);

        self.logger
            .debug(format!("Created CSR for '{common_name}' ({algorithm})"));
        CertificateSigningRequest::from_der(&der)
    }

    /// Sign a CSR with the issuer's key.
    ///
    /// Checks run in order: CSR self-signature, then issuer key against the
    /// issuer certificate.
    pub fn issue(
        &self,
        issuer_key_pair: &KeyPair,
        issuer_certificate: &Certificate,
        csr: &CertificateSigningRequest,
    ) -> Result<Certificate> {
        match csr.verify_signature() {
            Ok(true) => {}
            Ok(false) => {
                return Err(KeyError::InvalidCsrSignature(format!(
                    "signature of CSR for '{}' does not verify against its public key",
                    csr.subject_common_name()
                )))
            }
            Err(e) => return Err(KeyError::InvalidCsrSignature(e.to_string())),
        }

        if !public_keys_equal(
            issuer_key_pair.public_key(),
            issuer_certificate.subject_public_key(),
        ) {
            return Err(KeyError::IssuerKeyMismatch(format!(
                "key pair does not belong to issuer '{}'",
                issuer_certificate.subject_common_name()
            )));
        }

        let algorithm = issuer_key_pair.signature_algorithm();
        let spki =
            SubjectPublicKeyInfoOwned::from_der(csr.subject_public_key_der()).map_err(encoding)?;
        let issuer_spki = SubjectPublicKeyInfoOwned::from_der(
            issuer_certificate.subject_public_key_der(),
        )
        .map_err(encoding)?;
        let issuer_ski = compute_ski(&issuer_spki)?;

        let mut extensions = vec![
            extension(OID_SKI, false, &compute_ski(&spki)?)?,
            extension(
                OID_AKI,
                false,
                &AuthorityKeyIdentifier {
                    key_identifier: Some(issuer_ski.0),
                    authority_cert_issuer: None,
                    authority_cert_serial_number: None,
                },
            )?,
        ];
        if self.config.embed_auto_id {
            let id = auto_id::derive_from_parts(algorithm, csr.subject_public_key_der())?;
            extensions.push(auto_id_extension(&id)?);
        }

        let tbs_der = self.build_tbs(
            algorithm,
            name_from_common_name(issuer_certificate.subject_common_name())?,
            name_from_common_name(csr.subject_common_name())?,
            spki,
            extensions,
        )?;
        let der = sign_into_certificate(issuer_key_pair, &tbs_der)?;
        let certificate = Certificate::decode(&der, Some(issuer_certificate.subject_public_key()))?;

        self.logger.info(format!(
            "Issued certificate for '{}' under '{}' ({algorithm})",
            csr.subject_common_name(),
            issuer_certificate.subject_common_name()
        ));
        Ok(certificate)
    }

    fn build_tbs(
        &self,
        algorithm: SignatureAlgorithm,
        issuer: Name,
        subject: Name,
        spki: SubjectPublicKeyInfoOwned,
        extensions: Vec<Extension>,
    ) -> Result<Vec<u8>> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| {
            KeyError::certificate(Stage::Encoding, format!("system clock before epoch: {e}"))
        })?;
        let lifetime = Duration::from_secs(u64::from(self.config.validity_days) * SECONDS_PER_DAY);

        let tbs = TbsCertificate {
            version: Version::V3,
            serial_number: random_serial()?,
            signature: AlgorithmIdentifierOwned::from_der(&algorithm.algorithm_identifier()?)
                .map_err(encoding)?,
            issuer,
            validity: Validity {
                not_before: time_at(now)?,
                not_after: time_at(now + lifetime)?,
            },
            subject,
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };
        self.logger.debug_args(format_args!(
            "Encoding TBS certificate valid for {} days",
            self.config.validity_days
        ));
        tbs.to_der().map_err(encoding)
    }
}

/// Self-issue with default configuration
pub fn self_issue(key_pair: &KeyPair, common_name: &str) -> Result<Certificate> {
    CertificateBuilder::default().self_issue(key_pair, common_name)
}

/// Create a CSR with default configuration
pub fn create_csr(key_pair: &KeyPair, common_name: &str) -> Result<CertificateSigningRequest> {
    CertificateBuilder::default().create_csr(key_pair, common_name)
}

/// Issue a certificate with default configuration
pub fn issue(
    issuer_key_pair: &KeyPair,
    issuer_certificate: &Certificate,
    csr: &CertificateSigningRequest,
) -> Result<Certificate> {
    CertificateBuilder::default().issue(issuer_key_pair, issuer_certificate, csr)
}

fn sign_into_certificate(signer: &KeyPair, tbs_der: &[u8]) -> Result<Vec<u8>> {
    let signature = signer.sign(tbs_der)?;
    let algorithm = signer.signature_algorithm().algorithm_identifier()?;
    Ok(asn1::assemble_signed(tbs_der, &algorithm, &signature))
}

fn name_from_common_name(common_name: &str) -> Result<Name> {
    if common_name.trim().is_empty() {
        return Err(KeyError::certificate(
            Stage::Encoding,
            "common name must not be empty",
        ));
    }
    let value = Any::new(Tag::Utf8String, common_name.as_bytes().to_vec()).map_err(encoding)?;
    let attribute = AttributeTypeAndValue {
        oid: OID_COMMON_NAME,
        value,
    };
    let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![attribute]).map_err(encoding)?);
    Ok(RdnSequence(vec![rdn]))
}

fn parsed_common_name(name: &X509Name<'_>, what: &str) -> Result<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            KeyError::certificate(Stage::Decoding, format!("{what} has no common name"))
        })
}

/// Strict decode with `x509-cert`. The whole certificate, and every
/// extension this crate writes, must re-encode to the bytes it came from.
fn check_canonical_certificate(der: &[u8]) -> Result<()> {
    let strict = x509_cert::Certificate::from_der(der)?;
    for ext in strict.tbs_certificate.extensions.iter().flatten() {
        let value = ext.extn_value.as_bytes();
        if ext.extn_id == OID_SAN {
            ensure_reencodes(&SubjectAltName::from_der(value)?, value, "SubjectAltName")?;
        } else if ext.extn_id == OID_SKI {
            ensure_reencodes(&SubjectKeyIdentifier::from_der(value)?, value, "SubjectKeyIdentifier")?;
        } else if ext.extn_id == OID_AKI {
            ensure_reencodes(
                &AuthorityKeyIdentifier::from_der(value)?,
                value,
                "AuthorityKeyIdentifier",
            )?;
        } else if ext.extn_id == OID_BASIC_CONSTRAINTS {
            ensure_reencodes(&BasicConstraints::from_der(value)?, value, "BasicConstraints")?;
        }
    }
    ensure_reencodes(&strict, der, "certificate")
}

fn ensure_reencodes(value: &impl Encode, der: &[u8], what: &str) -> Result<()> {
    if value.to_der()? != der {
        return Err(KeyError::asn1(
            Stage::Decoding,
            format!("{what} is not canonical DER"),
        ));
    }
    Ok(())
}

fn parse_certificate(der: &[u8]) -> Result<ParsedCertificate<'_>> {
    let (_, parsed) = ParsedCertificate::from_der(der).map_err(|e| {
        KeyError::certificate(Stage::Decoding, format!("Failed to parse certificate: {e}"))
    })?;
    Ok(parsed)
}

fn embedded_auto_id_of(parsed: &ParsedCertificate<'_>) -> Result<Option<AutoId>> {
    let san = parsed.subject_alternative_name().map_err(|e| {
        KeyError::certificate(Stage::Decoding, format!("Invalid SubjectAltName: {e}"))
    })?;
    let Some(san) = san else {
        return Ok(None);
    };
    for name in &san.value.general_names {
        if let ParsedGeneralName::URI(uri) = name {
            if uri.starts_with(AUTO_ID_URI_PREFIX) {
                return AutoId::from_uri(uri).map(Some);
            }
        }
    }
    Ok(None)
}

fn compute_ski(spki: &SubjectPublicKeyInfoOwned) -> Result<SubjectKeyIdentifier> {
    let digest = Sha1::digest(spki.subject_public_key.raw_bytes());
    Ok(SubjectKeyIdentifier(
        OctetString::new(digest.to_vec()).map_err(encoding)?,
    ))
}

fn extension(
    oid: const_oid::ObjectIdentifier,
    critical: bool,
    value: &impl Encode,
) -> Result<Extension> {
    let extn_value = OctetString::new(value.to_der().map_err(encoding)?).map_err(encoding)?;
    Ok(Extension {
        extn_id: oid,
        critical,
        extn_value,
    })
}

fn auto_id_extension(id: &AutoId) -> Result<Extension> {
    let uri = Ia5String::new(&id.to_uri()).map_err(encoding)?;
    extension(
        OID_SAN,
        false,
        &SubjectAltName(vec![GeneralName::UniformResourceIdentifier(uri)]),
    )
}

/// Random positive serial that always encodes in exactly 8 content octets
fn random_serial() -> Result<SerialNumber> {
    let value = (OsRng.next_u64() >> 1) | (1 << 62);
    SerialNumber::new(&value.to_be_bytes()).map_err(encoding)
}

fn time_at(since_epoch: Duration) -> Result<Time> {
    let datetime = DateTime::from_unix_duration(since_epoch).map_err(encoding)?;
    if datetime.year() >= 2050 {
        return Ok(Time::GeneralTime(GeneralizedTime::from_date_time(datetime)));
    }
    Ok(Time::UtcTime(
        UtcTime::from_date_time(datetime).map_err(encoding)?,
    ))
}

fn decode_pem(pem: &str, expected_label: &str) -> Result<Vec<u8>> {
    let (label, der) = der::pem::decode_vec(pem.trim().as_bytes())
        .map_err(|e| KeyError::asn1(Stage::Decoding, format!("Invalid PEM: {e}")))?;
    if label != expected_label {
        return Err(KeyError::asn1(
            Stage::Decoding,
            format!("expected a {expected_label} PEM block, found {label}"),
        ));
    }
    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> (KeyPair, Certificate) {
        let pair = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        let cert = self_issue(&pair, "root").unwrap();
        (pair, cert)
    }

    #[test]
    fn self_issued_certificate_verifies_and_links_to_itself() {
        let (pair, cert) = root();
        assert!(cert.is_self_issued());
        assert_eq!(cert.subject_common_name(), "root");
        assert_eq!(cert.issuer_common_name(), "root");
        assert!(public_keys_equal(cert.issuer_public_key(), pair.public_key()));
        assert!(cert.verify_signature().unwrap());
        assert!(cert.is_valid_at(SystemTime::now()));
    }

    #[test]
    fn serial_is_positive_and_eight_bytes() {
        let (_, cert) = root();
        assert_eq!(cert.serial_number().len(), 8);
        assert_eq!(cert.serial_number()[0] & 0xc0, 0x40);
    }

    #[test]
    fn raw_tbs_is_embedded_verbatim() {
        let (_, cert) = root();
        let parts = asn1::split_signed(cert.to_der()).unwrap();
        assert_eq!(parts.body, cert.raw_tbs_der());
        assert_eq!(parts.signature, cert.signature());
    }

    #[test]
    fn embedded_auto_id_matches_derivation() {
        let (_, cert) = root();
        assert_eq!(cert.embedded_auto_id(), Some(cert.auto_id().unwrap()));

        let pair = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        let builder = CertificateBuilder::new(
            IdentityConfig::default().with_embedded_auto_id(false),
            Arc::new(Logger::new_root(Component::Certificates, "test")),
        )
        .unwrap();
        let plain = builder.self_issue(&pair, "plain").unwrap();
        assert_eq!(plain.embedded_auto_id(), None);
    }

    #[test]
    fn pem_round_trip_preserves_bytes() {
        let (_, cert) = root();
        let back = Certificate::from_pem(&cert.to_pem().unwrap(), None).unwrap();
        assert_eq!(back, cert);
    }

    #[test]
    fn leaf_import_needs_its_issuer() {
        let (root_pair, root_cert) = root();
        let leaf_pair = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        let csr = create_csr(&leaf_pair, "leaf").unwrap();
        let leaf = issue(&root_pair, &root_cert, &csr).unwrap();

        let err = Certificate::from_der(leaf.to_der(), None).unwrap_err();
        assert_eq!(err.stage(), Stage::Verification);

        let imported = Certificate::from_der(leaf.to_der(), Some(&root_cert)).unwrap();
        assert_eq!(imported.kind(), leaf.kind());
    }

    #[test]
    fn builder_generates_keys_under_its_config() {
        let builder = CertificateBuilder::new(
            IdentityConfig::default().with_rsa_modulus_bits(1024),
            Arc::new(Logger::new_root(Component::Certificates, "test")),
        )
        .unwrap();
        let pair = builder.generate_key_pair(KeyAlgorithm::RsaPss).unwrap();
        assert_eq!(pair.algorithm(), KeyAlgorithm::RsaPss);
        assert!(builder.self_issue(&pair, "pss root").unwrap().verify_signature().unwrap());
    }

    #[test]
    fn out_of_range_validity_is_a_config_error() {
        let result = CertificateBuilder::new(
            IdentityConfig::default().with_validity_days(u32::MAX),
            Arc::new(Logger::new_root(Component::Certificates, "test")),
        );
        assert!(matches!(result, Err(KeyError::ConfigError(_))));
    }

    #[test]
    fn empty_common_name_is_rejected() {
        let pair = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        assert!(matches!(
            self_issue(&pair, "  "),
            Err(KeyError::CertificateError { stage: Stage::Encoding, .. })
        ));
    }

    #[test]
    fn display_summarises_the_certificate() {
        let (_, cert) = root();
        let text = cert.to_string();
        assert!(text.starts_with("Certificate (self-issued)"));
        assert!(text.contains("CN=root"));
        assert!(text.contains(&cert.auto_id().unwrap().to_string()));
    }

    #[test]
    fn csr_pem_round_trip() {
        let pair = KeyPair::generate(KeyAlgorithm::Ed25519).unwrap();
        let csr = create_csr(&pair, "device-7").unwrap();
        let back = CertificateSigningRequest::from_pem(&csr.to_pem().unwrap()).unwrap();
        assert_eq!(back, csr);
        assert!(back.verify_signature().unwrap());
    }
}
