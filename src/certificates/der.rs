//! DER assembly of a self-signed X.509 v1 certificate with `simple_asn1`.

use simple_asn1::{ASN1Block, BigInt, BigUint, OID};
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::errors::{Error, Result};

const OID_COMMON_NAME: &[u64] = &[2, 5, 4, 3];
const OID_ORGANIZATION: &[u64] = &[2, 5, 4, 10];
const OID_ORGANIZATIONAL_UNIT: &[u64] = &[2, 5, 4, 11];
const OID_RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
const OID_SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];

/// Distinguished name used as both subject and issuer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub organization: String,
    pub organizational_unit: String,
}

/// Everything that goes into the to-be-signed certificate
#[derive(Debug, Clone)]
pub struct TbsCertificate {
    pub serial: u64,
    pub name: DistinguishedName,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// PKCS#1 `RSAPublicKey` DER
    pub public_key_der: Vec<u8>,
}

fn oid(components: &[u64]) -> OID {
    OID::new(components.iter().map(|&n| BigUint::from(n)).collect())
}

fn sha256_with_rsa() -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![ASN1Block::ObjectIdentifier(0, oid(OID_SHA256_WITH_RSA)), ASN1Block::Null(0)],
    )
}

fn attribute(kind: &[u64], value: &str) -> ASN1Block {
    ASN1Block::Set(
        0,
        vec![ASN1Block::Sequence(
            0,
            vec![
                ASN1Block::ObjectIdentifier(0, oid(kind)),
                ASN1Block::UTF8String(0, value.to_string()),
            ],
        )],
    )
}

fn name_block(name: &DistinguishedName) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![
            attribute(OID_COMMON_NAME, &name.common_name),
            attribute(OID_ORGANIZATION, &name.organization),
            attribute(OID_ORGANIZATIONAL_UNIT, &name.organizational_unit),
        ],
    )
}

fn utc_time(moment: OffsetDateTime) -> ASN1Block {
    ASN1Block::UTCTime(0, PrimitiveDateTime::new(moment.date(), moment.time()))
}

fn subject_public_key_info(public_key_der: &[u8]) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Sequence(
                0,
                vec![ASN1Block::ObjectIdentifier(0, oid(OID_RSA_ENCRYPTION)), ASN1Block::Null(0)],
            ),
            ASN1Block::BitString(0, public_key_der.len() * 8, public_key_der.to_vec()),
        ],
    )
}

fn encode(block: &ASN1Block, what: &str) -> Result<Vec<u8>> {
    simple_asn1::to_der(block)
        .map_err(|e| Error::certificate(format!("failed to encode {}: {}", what, e)))
}

impl TbsCertificate {
    /// The v1 `TBSCertificate`; the version field is omitted.
    pub fn to_block(&self) -> ASN1Block {
        ASN1Block::Sequence(
            0,
            vec![
                ASN1Block::Integer(0, BigInt::from(self.serial)),
                sha256_with_rsa(),
                name_block(&self.name),
                ASN1Block::Sequence(0, vec![utc_time(self.not_before), utc_time(self.not_after)]),
                name_block(&self.name),
                subject_public_key_info(&self.public_key_der),
            ],
        )
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        encode(&self.to_block(), "tbsCertificate")
    }
}

/// Wrap a signed `TBSCertificate` into the final certificate DER.
///
/// `signature` must be over `tbs.to_der()`.
pub fn assemble_certificate(tbs: &TbsCertificate, signature: &[u8]) -> Result<Vec<u8>> {
    let certificate = ASN1Block::Sequence(
        0,
        vec![
            tbs.to_block(),
            sha256_with_rsa(),
            ASN1Block::BitString(0, signature.len() * 8, signature.to_vec()),
        ],
    );
    encode(&certificate, "certificate")
}
