//! Key pairs for every supported signature scheme.
//!
//! [`KeyPair`] hides whether the material is Ed25519 or RSA so the certificate
//! builder never branches on key type. The algorithm tag is fixed at
//! construction; RSA keys carry it because the modulus alone does not say
//! which padding scheme signs with it.

use crate::asn1::{self, AlgorithmParameters, Oid};
use crate::config::IdentityConfig;
use crate::error::{KeyError, Result, Stage};
use der::pem::LineEnding;
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

pub mod oids {
    pub const ED25519: &[u64] = &[1, 3, 101, 112];
    pub const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
    pub const RSASSA_PSS: &[u64] = &[1, 2, 840, 113549, 1, 1, 10];
    pub const SHA256_WITH_RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
    pub const MGF1: &[u64] = &[1, 2, 840, 113549, 1, 1, 8];
    pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
}

const OID_RSASSA_PSS: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");

const PSS_SALT_LENGTH: u8 = 32;

const PEM_PRIVATE_KEY: &str = "PRIVATE KEY";
const PEM_ENCRYPTED_PRIVATE_KEY: &str = "ENCRYPTED PRIVATE KEY";
const PEM_PUBLIC_KEY: &str = "PUBLIC KEY";

impl From<&const_oid::ObjectIdentifier> for Oid {
    fn from(oid: &const_oid::ObjectIdentifier) -> Self {
        let arcs: Vec<u64> = oid.arcs().map(u64::from).collect();
        Oid::new(&arcs)
    }
}

/// Key algorithm tag of a [`KeyPair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Ed25519,
    RsaPkcs1v15,
    RsaPss,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
            KeyAlgorithm::RsaPkcs1v15 => "rsa-pkcs1v15",
            KeyAlgorithm::RsaPss => "rsa-pss",
        }
    }

    /// Signature scheme produced by keys of this algorithm
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyAlgorithm::Ed25519 => SignatureAlgorithm::Ed25519,
            KeyAlgorithm::RsaPkcs1v15 => SignatureAlgorithm::RsaPkcs1v15Sha256,
            KeyAlgorithm::RsaPss => SignatureAlgorithm::RsaPssSha256,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "rsa" | "rsa-pkcs1v15" | "rsassa-pkcs1-v1_5" => Ok(KeyAlgorithm::RsaPkcs1v15),
            "rsa-pss" | "rsassa-pss" => Ok(KeyAlgorithm::RsaPss),
            other => Err(KeyError::unsupported(Stage::KeyGeneration, other)),
        }
    }
}

/// Signature schemes recorded in signed structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Ed25519,
    RsaPkcs1v15Sha256,
    RsaPssSha256,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> Oid {
        match self {
            SignatureAlgorithm::Ed25519 => Oid::new(oids::ED25519),
            SignatureAlgorithm::RsaPkcs1v15Sha256 => Oid::new(oids::SHA256_WITH_RSA_ENCRYPTION),
            SignatureAlgorithm::RsaPssSha256 => Oid::new(oids::RSASSA_PSS),
        }
    }

    pub fn from_oid(oid: &Oid) -> Result<Self> {
        match oid.arcs() {
            arcs if arcs == oids::ED25519 => Ok(SignatureAlgorithm::Ed25519),
            arcs if arcs == oids::SHA256_WITH_RSA_ENCRYPTION => {
                Ok(SignatureAlgorithm::RsaPkcs1v15Sha256)
            }
            arcs if arcs == oids::RSASSA_PSS => Ok(SignatureAlgorithm::RsaPssSha256),
            _ => Err(KeyError::unsupported(
                Stage::Decoding,
                format!("signature algorithm {oid}"),
            )),
        }
    }

    /// AlgorithmIdentifier as embedded in certificates and CSRs
    pub fn algorithm_identifier(&self) -> Result<Vec<u8>> {
        match self {
            SignatureAlgorithm::Ed25519 => {
                asn1::encode_algorithm_identifier(&self.oid(), AlgorithmParameters::Absent)
            }
            SignatureAlgorithm::RsaPkcs1v15Sha256 => {
                asn1::encode_algorithm_identifier(&self.oid(), AlgorithmParameters::Null)
            }
            SignatureAlgorithm::RsaPssSha256 => {
                let params = pss_sha256_params()?;
                asn1::encode_algorithm_identifier(&self.oid(), AlgorithmParameters::Der(&params))
            }
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureAlgorithm::Ed25519 => "Ed25519",
            SignatureAlgorithm::RsaPkcs1v15Sha256 => "sha256WithRSAEncryption",
            SignatureAlgorithm::RsaPssSha256 => "RSASSA-PSS (SHA-256)",
        };
        f.write_str(name)
    }
}

/// RSASSA-PSS-params for SHA-256, MGF1-SHA-256, 32-byte salt
fn pss_sha256_params() -> Result<Vec<u8>> {
    let sha256 = asn1::encode_algorithm_identifier(&Oid::new(oids::SHA256), AlgorithmParameters::Null)?;
    let mgf1 = asn1::encode_algorithm_identifier(&Oid::new(oids::MGF1), AlgorithmParameters::Der(&sha256))?;
    let salt = asn1::encode_tlv(asn1::TAG_INTEGER, &[PSS_SALT_LENGTH]);
    Ok(asn1::encode_sequence(&[
        &asn1::encode_tlv(0xa0, &sha256),
        &asn1::encode_tlv(0xa1, &mgf1),
        &asn1::encode_tlv(0xa2, &salt),
    ]))
}

/// Public half of a key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// Parse a DER SubjectPublicKeyInfo
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let oid = asn1::extract_signature_algorithm_oid(der).map_err(|e| e.at(Stage::KeyImport))?;
        match oid.arcs() {
            arcs if arcs == oids::ED25519 => ed25519_dalek::VerifyingKey::from_public_key_der(der)
                .map(PublicKey::Ed25519)
                .map_err(|e| {
                    KeyError::key_format(Stage::KeyImport, format!("Invalid Ed25519 public key: {e}"))
                }),
            arcs if arcs == oids::RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(der)
                .map(PublicKey::Rsa)
                .map_err(|e| {
                    KeyError::key_format(Stage::KeyImport, format!("Invalid RSA public key: {e}"))
                }),
            arcs if arcs == oids::RSASSA_PSS => {
                // rsa only accepts rsaEncryption SPKIs, so unwrap the PKCS#1 key by hand
                let mut top = asn1::DerReader::new(der);
                let spki = top.read_expected(asn1::TAG_SEQUENCE)?;
                top.finish()?;
                let mut fields = asn1::DerReader::new(spki.content);
                fields.read_expected(asn1::TAG_SEQUENCE)?;
                let bits = fields.read_expected(asn1::TAG_BIT_STRING)?;
                fields.finish()?;
                let pkcs1 = match bits.content.split_first() {
                    Some((&0, key)) => key,
                    _ => {
                        return Err(KeyError::asn1(
                            Stage::KeyImport,
                            "RSA-PSS public key BIT STRING must have zero unused bits",
                        ))
                    }
                };
                RsaPublicKey::from_pkcs1_der(pkcs1)
                    .map(PublicKey::Rsa)
                    .map_err(|e| {
                        KeyError::key_format(Stage::KeyImport, format!("Invalid RSA-PSS public key: {e}"))
                    })
            }
            _ => Err(KeyError::unsupported(Stage::KeyImport, format!("public key {oid}"))),
        }
    }

    /// DER SubjectPublicKeyInfo; RSA keys always use rsaEncryption
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let doc = match self {
            PublicKey::Ed25519(key) => key.to_public_key_der(),
            PublicKey::Rsa(key) => key.to_public_key_der(),
        }
        .map_err(|e| KeyError::key_format(Stage::KeyExport, format!("SPKI encoding error: {e}")))?;
        Ok(doc.as_bytes().to_vec())
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, der) = der::pem::decode_vec(pem.trim().as_bytes())
            .map_err(|e| KeyError::key_format(Stage::KeyImport, format!("Invalid PEM: {e}")))?;
        if label != PEM_PUBLIC_KEY {
            return Err(KeyError::key_format(
                Stage::KeyImport,
                format!("Expected a PUBLIC KEY PEM block, found {label}"),
            ));
        }
        Self::from_spki_der(&der)
    }

    pub fn to_pem(&self) -> Result<String> {
        let der = self.to_spki_der()?;
        der::pem::encode_string(PEM_PUBLIC_KEY, LineEnding::LF, &der)
            .map_err(|e| KeyError::key_format(Stage::KeyExport, format!("PEM encoding error: {e}")))
    }

    /// Encoding-independent key bytes: the 32-byte point for Ed25519, the
    /// PKCS#1 RSAPublicKey for RSA
    pub fn raw_bytes(&self) -> Result<Vec<u8>> {
        match self {
            PublicKey::Ed25519(key) => Ok(key.as_bytes().to_vec()),
            PublicKey::Rsa(key) => key
                .to_pkcs1_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| {
                    KeyError::key_format(Stage::KeyExport, format!("PKCS#1 encoding error: {e}"))
                }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PublicKey::Ed25519(_) => "ed25519",
            PublicKey::Rsa(_) => "rsa",
        }
    }
}

/// Compare two public keys by their normalized key bytes
pub fn public_keys_equal(a: &PublicKey, b: &PublicKey) -> bool {
    match (a.raw_bytes(), b.raw_bytes()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Verify `signature` over `message`.
///
/// A signature that does not match (including one of the wrong length) is
/// `Ok(false)`. Only a key that cannot be used with `algorithm` is an error.
pub fn verify(
    public_key: &PublicKey,
    algorithm: SignatureAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<bool> {
    match (public_key, algorithm) {
        (PublicKey::Ed25519(key), SignatureAlgorithm::Ed25519) => {
            let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                return Ok(false);
            };
            Ok(key.verify_strict(message, &signature).is_ok())
        }
        (PublicKey::Rsa(key), SignatureAlgorithm::RsaPkcs1v15Sha256) => {
            let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
                return Ok(false);
            };
            let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone());
            Ok(verifying_key.verify(message, &signature).is_ok())
        }
        (PublicKey::Rsa(key), SignatureAlgorithm::RsaPssSha256) => {
            let Ok(signature) = rsa::pss::Signature::try_from(signature) else {
                return Ok(false);
            };
            let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(key.clone());
            Ok(verifying_key.verify(message, &signature).is_ok())
        }
        (key, algorithm) => Err(KeyError::key_format(
            Stage::Verification,
            format!("{} key cannot verify {algorithm} signatures", key.kind()),
        )),
    }
}

#[derive(Clone)]
enum SecretMaterial {
    Ed25519(ed25519_dalek::SigningKey),
    Rsa(RsaPrivateKey),
}

/// Asymmetric key pair with a fixed algorithm tag
#[derive(Clone)]
pub struct KeyPair {
    algorithm: KeyAlgorithm,
    public_key: PublicKey,
    secret: Option<SecretMaterial>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm)
            .field("public_key", &self.public_key)
            .field("has_private_key", &self.secret.is_some())
            .finish()
    }
}

impl KeyPair {
    /// Generate fresh key material with default settings
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self> {
        Self::generate_with(algorithm, &IdentityConfig::default())
    }

    /// Generate fresh key material; RSA modulus size comes from `config`
    pub fn generate_with(algorithm: KeyAlgorithm, config: &IdentityConfig) -> Result<Self> {
        match algorithm {
            KeyAlgorithm::Ed25519 => Ok(Self::from_ed25519(
                ed25519_dalek::SigningKey::generate(&mut OsRng),
            )),
            KeyAlgorithm::RsaPkcs1v15 | KeyAlgorithm::RsaPss => {
                config.validate()?;
                let key = RsaPrivateKey::new(&mut OsRng, config.rsa_modulus_bits).map_err(|e| {
                    KeyError::key_format(Stage::KeyGeneration, format!("RSA key generation failed: {e}"))
                })?;
                Self::from_rsa(algorithm, key)
            }
        }
    }

    pub fn from_ed25519(signing_key: ed25519_dalek::SigningKey) -> Self {
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            public_key: PublicKey::Ed25519(signing_key.verifying_key()),
            secret: Some(SecretMaterial::Ed25519(signing_key)),
        }
    }

    pub fn from_rsa(algorithm: KeyAlgorithm, key: RsaPrivateKey) -> Result<Self> {
        if algorithm == KeyAlgorithm::Ed25519 {
            return Err(KeyError::key_format(
                Stage::KeyImport,
                "RSA key material cannot carry the ed25519 tag",
            ));
        }
        Ok(Self {
            algorithm,
            public_key: PublicKey::Rsa(key.to_public_key()),
            secret: Some(SecretMaterial::Rsa(key)),
        })
    }

    /// A verification-only pair; signing fails with `SigningError`
    pub fn public_only(algorithm: KeyAlgorithm, public_key: PublicKey) -> Result<Self> {
        let matches = matches!(
            (algorithm, &public_key),
            (KeyAlgorithm::Ed25519, PublicKey::Ed25519(_))
                | (KeyAlgorithm::RsaPkcs1v15 | KeyAlgorithm::RsaPss, PublicKey::Rsa(_))
        );
        if !matches {
            return Err(KeyError::key_format(
                Stage::KeyImport,
                format!("{} public key cannot carry the {algorithm} tag", public_key.kind()),
            ));
        }
        Ok(Self {
            algorithm,
            public_key,
            secret: None,
        })
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.algorithm.signature_algorithm()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn has_private_key(&self) -> bool {
        self.secret.is_some()
    }

    /// Sign a message; deterministic for Ed25519, randomized salt for RSA-PSS
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let secret = self.secret.as_ref().ok_or_else(|| {
            KeyError::signing(Stage::Signing, "key pair holds no private key material")
        })?;
        match (secret, self.algorithm) {
            (SecretMaterial::Ed25519(key), KeyAlgorithm::Ed25519) => {
                Ok(key.sign(message).to_bytes().to_vec())
            }
            (SecretMaterial::Rsa(key), KeyAlgorithm::RsaPkcs1v15) => {
                let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone());
                signing_key
                    .try_sign(message)
                    .map(|sig| sig.to_vec())
                    .map_err(|e| KeyError::signing(Stage::Signing, format!("RSA PKCS#1 v1.5: {e}")))
            }
            (SecretMaterial::Rsa(key), KeyAlgorithm::RsaPss) => {
                let signing_key = rsa::pss::BlindedSigningKey::<Sha256>::new(key.clone());
                signing_key
                    .try_sign_with_rng(&mut OsRng, message)
                    .map(|sig| sig.to_vec())
                    .map_err(|e| KeyError::signing(Stage::Signing, format!("RSA-PSS: {e}")))
            }
            _ => Err(KeyError::signing(
                Stage::Signing,
                format!("key material does not match the {} tag", self.algorithm),
            )),
        }
    }

    /// Verify a signature made by this pair's algorithm
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        verify(&self.public_key, self.signature_algorithm(), message, signature)
    }

    /// Unencrypted PKCS#8 DER. RSA-PSS keys use the id-RSASSA-PSS algorithm
    /// so the tag survives a round trip.
    pub fn private_key_der(&self) -> Result<pkcs8::SecretDocument> {
        let secret = self.secret.as_ref().ok_or_else(|| {
            KeyError::key_format(Stage::KeyExport, "key pair holds no private key material")
        })?;
        let export_err =
            |e: &dyn fmt::Display| KeyError::key_format(Stage::KeyExport, format!("PKCS#8 encoding error: {e}"));
        match (secret, self.algorithm) {
            (SecretMaterial::Ed25519(key), _) => key.to_pkcs8_der().map_err(|e| export_err(&e)),
            (SecretMaterial::Rsa(key), KeyAlgorithm::RsaPss) => {
                let pkcs1 = key.to_pkcs1_der().map_err(|e| export_err(&e))?;
                let info = pkcs8::PrivateKeyInfo::new(
                    pkcs8::AlgorithmIdentifierRef {
                        oid: OID_RSASSA_PSS,
                        parameters: None,
                    },
                    pkcs1.as_bytes(),
                );
                pkcs8::SecretDocument::try_from(info).map_err(|e| export_err(&e))
            }
            (SecretMaterial::Rsa(key), _) => key.to_pkcs8_der().map_err(|e| export_err(&e)),
        }
    }

    /// Parse an unencrypted PKCS#8 DER private key
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = pkcs8::PrivateKeyInfo::try_from(der)
            .map_err(|e| KeyError::asn1(Stage::KeyImport, format!("Invalid PKCS#8 structure: {e}")))?;
        let oid = Oid::from(&info.algorithm.oid);
        let import_err =
            |e: &dyn fmt::Display| KeyError::key_format(Stage::KeyImport, format!("Invalid {oid} key: {e}"));
        match oid.arcs() {
            arcs if arcs == oids::ED25519 => ed25519_dalek::SigningKey::from_pkcs8_der(der)
                .map(Self::from_ed25519)
                .map_err(|e| import_err(&e)),
            arcs if arcs == oids::RSA_ENCRYPTION => {
                let key = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| import_err(&e))?;
                Self::from_rsa(KeyAlgorithm::RsaPkcs1v15, key)
            }
            arcs if arcs == oids::RSASSA_PSS => {
                let key = RsaPrivateKey::from_pkcs1_der(info.private_key).map_err(|e| import_err(&e))?;
                Self::from_rsa(KeyAlgorithm::RsaPss, key)
            }
            _ => Err(KeyError::unsupported(Stage::KeyImport, format!("private key {oid}"))),
        }
    }

    /// PKCS#8 PEM; with a password the key is wrapped in PBES2
    /// (PBKDF2-SHA256 + AES-256-CBC) using default iteration count
    pub fn to_pem(&self, password: Option<&str>) -> Result<String> {
        self.to_pem_with(password, &IdentityConfig::default())
    }

    pub fn to_pem_with(&self, password: Option<&str>, config: &IdentityConfig) -> Result<String> {
        let der = self.private_key_der()?;
        let pem_err =
            |e: &dyn fmt::Display| KeyError::key_format(Stage::KeyExport, format!("PEM encoding error: {e}"));

        let Some(password) = password else {
            let pem = der.to_pem(PEM_PRIVATE_KEY, LineEnding::LF).map_err(|e| pem_err(&e))?;
            return Ok(pem.as_str().to_owned());
        };

        config.validate()?;
        let info = pkcs8::PrivateKeyInfo::try_from(der.as_bytes()).map_err(|e| pem_err(&e))?;
        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params = pkcs8::pkcs5::pbes2::Parameters::pbkdf2_sha256_aes256cbc(
            config.pbkdf2_iterations,
            &salt,
            &iv,
        )
        .map_err(|e| pem_err(&e))?;
        let encrypted = info
            .encrypt_with_params(params, password)
            .map_err(|e| pem_err(&e))?;
        let pem = encrypted
            .to_pem(PEM_ENCRYPTED_PRIVATE_KEY, LineEnding::LF)
            .map_err(|e| pem_err(&e))?;
        Ok(pem.as_str().to_owned())
    }

    /// Inverse of [`KeyPair::to_pem`]. Encrypted PEM needs the password; a
    /// wrong password is always a `DecryptionError`.
    pub fn from_pem(pem: &str, password: Option<&str>) -> Result<Self> {
        let (label, doc) = pkcs8::SecretDocument::from_pem(pem.trim())
            .map_err(|e| KeyError::key_format(Stage::KeyImport, format!("Invalid PEM: {e}")))?;
        match label {
            PEM_PRIVATE_KEY => Self::from_pkcs8_der(doc.as_bytes()),
            PEM_ENCRYPTED_PRIVATE_KEY => {
                let password = password.ok_or_else(|| {
                    KeyError::DecryptionError("encrypted PEM requires a password".to_string())
                })?;
                let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(doc.as_bytes()).map_err(|e| {
                    KeyError::asn1(Stage::KeyImport, format!("Invalid EncryptedPrivateKeyInfo: {e}"))
                })?;
                let decrypted = encrypted
                    .decrypt(password)
                    .map_err(|e| KeyError::DecryptionError(e.to_string()))?;
                // A wrong password can still yield valid padding; garbage
                // plaintext must not surface as a format error.
                Self::from_pkcs8_der(decrypted.as_bytes()).map_err(|e| match e {
                    KeyError::UnsupportedAlgorithm { .. } => e,
                    other => KeyError::DecryptionError(format!("decrypted data is not a key: {other}")),
                })
            }
            other => Err(KeyError::key_format(
                Stage::KeyImport,
                format!("Unexpected PEM label {other}"),
            )),
        }
    }
}

/// Public key PEM derived from a private key PEM
pub fn pem_public_from_private_key(private_pem: &str, password: Option<&str>) -> Result<String> {
    KeyPair::from_pem(private_pem, password)?.public_key().to_pem()
}
