//! Minimal DER codec for the structures the registry compares byte-for-byte.
//!
//! Everything here is canonical DER: definite, minimal lengths and minimal
//! base-128 OID arcs. The decoder rejects anything else instead of
//! normalising it.

use crate::error::{KeyError, Result, Stage};
use der::{Decode, Header, Reader, SliceReader};
use std::fmt;
use std::str::FromStr;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_BIT_STRING: u8 = 0x03;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

/// Object identifier as a dotted-integer arc sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u64>);

impl Oid {
    pub fn new(arcs: &[u64]) -> Self {
        Self(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{arc}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self> {
        let arcs = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| KeyError::asn1(Stage::Encoding, format!("invalid OID arc '{part}' in '{s}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(arcs))
    }
}

impl From<&[u64]> for Oid {
    fn from(arcs: &[u64]) -> Self {
        Self::new(arcs)
    }
}

/* -------------------------------------------------------------------------
 * Encoding
 * ---------------------------------------------------------------------- */

/// Definite-form length octets, always the shortest form
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    let mut out = Vec::with_capacity(1 + significant.len());
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
    out
}

pub fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let length = encode_length(content.len());
    let mut out = Vec::with_capacity(1 + length.len() + content.len());
    out.push(tag);
    out.extend_from_slice(&length);
    out.extend_from_slice(content);
    out
}

/// SEQUENCE over already-encoded elements
pub fn encode_sequence(elements: &[&[u8]]) -> Vec<u8> {
    encode_tlv(TAG_SEQUENCE, &elements.concat())
}

/// BIT STRING with zero unused bits
pub fn encode_bit_string(bytes: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(bytes.len() + 1);
    content.push(0);
    content.extend_from_slice(bytes);
    encode_tlv(TAG_BIT_STRING, &content)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

/// Encode an OID as a complete DER TLV (tag 0x06)
pub fn encode_oid(oid: &Oid) -> Result<Vec<u8>> {
    let arcs = oid.arcs();
    if arcs.len() < 2 {
        return Err(KeyError::asn1(
            Stage::Encoding,
            format!("OID '{oid}' needs at least two arcs"),
        ));
    }
    let (first, second) = (arcs[0], arcs[1]);
    if first > 2 || (first < 2 && second > 39) {
        return Err(KeyError::asn1(
            Stage::Encoding,
            format!("OID '{oid}' has an out-of-range leading arc"),
        ));
    }
    let head = (first * 40)
        .checked_add(second)
        .ok_or_else(|| KeyError::asn1(Stage::Encoding, format!("OID '{oid}' overflows")))?;

    let mut content = Vec::new();
    push_base128(&mut content, head);
    for arc in &arcs[2..] {
        push_base128(&mut content, *arc);
    }
    Ok(encode_tlv(TAG_OID, &content))
}

/// Parameters slot of an AlgorithmIdentifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmParameters<'a> {
    /// Field omitted (Ed25519, ECDSA)
    Absent,
    /// Explicit NULL (RSA PKCS#1 v1.5)
    Null,
    /// A complete pre-encoded TLV (e.g. RSASSA-PSS-params)
    Der(&'a [u8]),
}

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }`
pub fn encode_algorithm_identifier(oid: &Oid, params: AlgorithmParameters<'_>) -> Result<Vec<u8>> {
    let oid_der = encode_oid(oid)?;
    let params_der = match params {
        AlgorithmParameters::Absent => Vec::new(),
        AlgorithmParameters::Null => vec![TAG_NULL, 0x00],
        AlgorithmParameters::Der(raw) => {
            let mut reader = DerReader::new(raw);
            reader.read_tlv().map_err(|e| e.at(Stage::Encoding))?;
            reader.finish().map_err(|e| e.at(Stage::Encoding))?;
            raw.to_vec()
        }
    };
    Ok(encode_sequence(&[&oid_der, &params_der]))
}

/// Signature-algorithm identifier in the exact form the on-chain pallet
/// compares against: `SEQUENCE { OID, NULL }` regardless of algorithm.
pub fn der_encode_signature_algorithm_oid(oid: &Oid) -> Result<Vec<u8>> {
    encode_algorithm_identifier(oid, AlgorithmParameters::Null)
}

/* -------------------------------------------------------------------------
 * Decoding
 * ---------------------------------------------------------------------- */

/// One decoded tag-length-value element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub content: &'a [u8],
    /// Full encoding including tag and length octets
    pub raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn expect_tag(self, tag: u8) -> Result<Self> {
        if self.tag != tag {
            return Err(KeyError::asn1(
                Stage::Decoding,
                format!("expected tag 0x{tag:02x}, found 0x{:02x}", self.tag),
            ));
        }
        Ok(self)
    }
}

fn malformed(err: der::Error) -> KeyError {
    match err.kind() {
        der::ErrorKind::Incomplete { .. } => {
            KeyError::asn1(Stage::Decoding, format!("truncated element: {err}"))
        }
        _ => KeyError::from(err),
    }
}

/// Sequential reader over concatenated DER elements
pub struct DerReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_tag(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Read the next element. Header parsing goes through `der`, which
    /// rejects indefinite, non-minimal and oversized lengths.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>> {
        let rest = self.data.get(self.pos..).unwrap_or_default();
        let mut reader = SliceReader::new(rest).map_err(malformed)?;
        let header = Header::decode(&mut reader).map_err(malformed)?;
        let content = reader.read_slice(header.length).map_err(malformed)?;
        let consumed = usize::try_from(reader.position()).map_err(malformed)?;
        self.pos += consumed;
        Ok(Tlv {
            tag: u8::from(header.tag),
            content,
            raw: &rest[..consumed],
        })
    }

    pub fn read_expected(&mut self, tag: u8) -> Result<Tlv<'a>> {
        self.read_tlv()?.expect_tag(tag)
    }

    /// Fail if unread bytes remain
    pub fn finish(&self) -> Result<()> {
        if !self.is_empty() {
            return Err(KeyError::asn1(
                Stage::Decoding,
                format!("{} trailing bytes", self.data.len() - self.pos),
            ));
        }
        Ok(())
    }
}

/// Decode the content octets of an OID
pub fn decode_oid_content(content: &[u8]) -> Result<Oid> {
    if content.is_empty() {
        return Err(KeyError::asn1(Stage::Decoding, "empty OID"));
    }
    if content[content.len() - 1] & 0x80 != 0 {
        return Err(KeyError::asn1(Stage::Decoding, "truncated OID arc"));
    }

    let mut values = Vec::new();
    let mut current: u64 = 0;
    let mut at_start = true;
    for byte in content {
        if at_start && *byte == 0x80 {
            return Err(KeyError::asn1(
                Stage::Decoding,
                "non-minimal OID arc encoding",
            ));
        }
        current = current
            .checked_mul(128)
            .and_then(|v| v.checked_add((byte & 0x7f) as u64))
            .ok_or_else(|| KeyError::asn1(Stage::Decoding, "OID arc overflows 64 bits"))?;
        at_start = byte & 0x80 == 0;
        if at_start {
            values.push(current);
            current = 0;
        }
    }

    let head = values[0];
    let mut arcs = Vec::with_capacity(values.len() + 1);
    match head {
        0..=39 => arcs.extend([0, head]),
        40..=79 => arcs.extend([1, head - 40]),
        _ => arcs.extend([2, head - 80]),
    }
    arcs.extend_from_slice(&values[1..]);
    Ok(Oid(arcs))
}

/// Decode a complete OID TLV
pub fn decode_oid(der: &[u8]) -> Result<Oid> {
    let mut reader = DerReader::new(der);
    let tlv = reader.read_expected(TAG_OID)?;
    reader.finish()?;
    decode_oid_content(tlv.content)
}

fn algorithm_oid(alg_id: Tlv<'_>) -> Result<Oid> {
    let mut reader = DerReader::new(alg_id.expect_tag(TAG_SEQUENCE)?.content);
    let oid = reader.read_expected(TAG_OID)?;
    decode_oid_content(oid.content)
}

/// Algorithm OID of a DER SubjectPublicKeyInfo, or the signature algorithm
/// OID of a DER Certificate / CertificationRequest.
pub fn extract_signature_algorithm_oid(der: &[u8]) -> Result<Oid> {
    let mut top = DerReader::new(der);
    let outer = top.read_expected(TAG_SEQUENCE)?;
    top.finish()?;

    let mut fields = DerReader::new(outer.content);
    let first = fields.read_expected(TAG_SEQUENCE)?;
    let alg_id = if first.content.first() == Some(&TAG_OID) {
        // SubjectPublicKeyInfo: algorithm comes first
        first
    } else {
        // Signed structure: body, then signatureAlgorithm
        fields.read_expected(TAG_SEQUENCE)?
    };
    fields.read_expected(TAG_BIT_STRING)?;
    fields.finish()?;
    algorithm_oid(alg_id)
}

/// Raw pieces of a `SEQUENCE { body, AlgorithmIdentifier, BIT STRING }`
#[derive(Debug, Clone, Copy)]
pub struct SignedParts<'a> {
    pub body: &'a [u8],
    pub algorithm: &'a [u8],
    pub algorithm_oid: &'a [u8],
    pub signature: &'a [u8],
}

/// Split a signed structure without re-encoding any part of it
pub fn split_signed(der: &[u8]) -> Result<SignedParts<'_>> {
    let mut top = DerReader::new(der);
    let outer = top.read_expected(TAG_SEQUENCE)?;
    top.finish()?;

    let mut fields = DerReader::new(outer.content);
    let body = fields.read_expected(TAG_SEQUENCE)?;
    let algorithm = fields.read_expected(TAG_SEQUENCE)?;
    let bits = fields.read_expected(TAG_BIT_STRING)?;
    fields.finish()?;

    let mut alg_fields = DerReader::new(algorithm.content);
    let oid = alg_fields.read_expected(TAG_OID)?;

    let (unused, signature) = bits
        .content
        .split_first()
        .ok_or_else(|| KeyError::asn1(Stage::Decoding, "empty signature BIT STRING"))?;
    if *unused != 0 {
        return Err(KeyError::asn1(
            Stage::Decoding,
            format!("signature BIT STRING has {unused} unused bits"),
        ));
    }

    Ok(SignedParts {
        body: body.raw,
        algorithm: algorithm.raw,
        algorithm_oid: oid.raw,
        signature,
    })
}

/// Build a signed structure from its three encoded parts
pub fn assemble_signed(body: &[u8], algorithm: &[u8], signature: &[u8]) -> Vec<u8> {
    encode_sequence(&[body, algorithm, &encode_bit_string(signature)])
}
