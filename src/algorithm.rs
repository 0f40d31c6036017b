use std::{fmt, str::FromStr};

use byteorder::{BigEndian, ByteOrder};
use crc::{Crc, CRC_32_ISO_HDLC, CRC_64_XZ};
use digest::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::error::{Error, Result};

/// Size in bytes of a CRC32 checksum.
pub const CRC32_WIDTH: usize = 4;
/// Size in bytes of a CRC64 checksum.
pub const CRC64_WIDTH: usize = 8;
/// Size in bytes of a SHA-256 hash.
pub const SHA256_WIDTH: usize = 32;
/// Number of leading SHA-256 bytes kept by [`Algorithm::Sha256Truncated`].
pub const SHA256_TRUNCATED_WIDTH: usize = 8;

const _: () = assert!(SHA256_TRUNCATED_WIDTH <= SHA256_WIDTH);

// CRC-32/ISO-HDLC is the IEEE 802.3 checksum; CRC-64/XZ is the reflected ECMA-182 one.
static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

const SELECTOR_DEFAULT: u8 = 0;
const SELECTOR_CRC32: u8 = 1;
const SELECTOR_CRC64: u8 = 2;
const SELECTOR_SHA256: u8 = 3;
const SELECTOR_SHA256_TRUNCATED: u8 = 4;

/// A digest algorithm selector.
///
/// `Default` is an alias which contexts resolve to [`Algorithm::DEFAULT_RESOLUTION`]
/// when they are built; every other variant names a concrete algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Resolves to [`Algorithm::DEFAULT_RESOLUTION`].
    #[default]
    Default,
    /// CRC-32/ISO-HDLC.
    Crc32,
    /// CRC-64/XZ.
    Crc64,
    /// SHA-256.
    Sha256,
    /// The first 8 bytes of SHA-256.
    Sha256Truncated,
}

impl Algorithm {
    /// The concrete algorithm `Default` stands for.
    pub const DEFAULT_RESOLUTION: Algorithm = Algorithm::Sha256Truncated;

    /// resolve maps `Default` to its concrete algorithm and every other selector to itself.
    pub const fn resolve(self) -> Algorithm {
        match self {
            Algorithm::Default => Self::DEFAULT_RESOLUTION,
            concrete => concrete,
        }
    }

    /// output_width returns the number of raw digest bytes the algorithm produces.
    pub const fn output_width(self) -> usize {
        match self.resolve() {
            Algorithm::Crc32 => CRC32_WIDTH,
            Algorithm::Crc64 => CRC64_WIDTH,
            Algorithm::Sha256 => SHA256_WIDTH,
            Algorithm::Sha256Truncated | Algorithm::Default => SHA256_TRUNCATED_WIDTH,
        }
    }

    /// compute runs the algorithm over `data` and returns exactly `output_width` bytes.
    pub fn compute(self, data: &[u8]) -> Vec<u8> {
        let mut h = self.hasher();
        h.update(data);
        h.finalize()
    }

    /// The short name used by `Display` and `FromStr`.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Default => "default",
            Algorithm::Crc32 => "crc32",
            Algorithm::Crc64 => "crc64",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha256Truncated => "sha256t",
        }
    }

    pub(crate) fn hasher(self) -> Hasher {
        match self.resolve() {
            Algorithm::Crc32 => Hasher::Crc32(CRC32.digest()),
            Algorithm::Crc64 => Hasher::Crc64(CRC64.digest()),
            Algorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            Algorithm::Sha256Truncated | Algorithm::Default => {
                Hasher::Sha256Truncated(Sha256::new())
            }
        }
    }
}

/// Incremental state of one digest computation.
pub(crate) enum Hasher {
    Crc32(crc::Digest<'static, u32>),
    Crc64(crc::Digest<'static, u64>),
    Sha256(Sha256),
    Sha256Truncated(Sha256),
}

impl Hasher {
    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Crc32(d) => d.update(data),
            Hasher::Crc64(d) => d.update(data),
            Hasher::Sha256(h) | Hasher::Sha256Truncated(h) => h.update(data),
        }
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Crc32(d) => {
                let mut out = vec![0; CRC32_WIDTH];
                BigEndian::write_u32(&mut out, d.finalize());
                out
            }
            Hasher::Crc64(d) => {
                let mut out = vec![0; CRC64_WIDTH];
                BigEndian::write_u64(&mut out, d.finalize());
                out
            }
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha256Truncated(h) => h.finalize()[..SHA256_TRUNCATED_WIDTH].to_vec(),
        }
    }
}

impl TryFrom<u8> for Algorithm {
    type Error = Error;

    fn try_from(selector: u8) -> Result<Self> {
        match selector {
            SELECTOR_DEFAULT => Ok(Algorithm::Default),
            SELECTOR_CRC32 => Ok(Algorithm::Crc32),
            SELECTOR_CRC64 => Ok(Algorithm::Crc64),
            SELECTOR_SHA256 => Ok(Algorithm::Sha256),
            SELECTOR_SHA256_TRUNCATED => Ok(Algorithm::Sha256Truncated),
            other => Err(Error::UnsupportedAlgorithm(other)),
        }
    }
}

impl From<Algorithm> for u8 {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Default => SELECTOR_DEFAULT,
            Algorithm::Crc32 => SELECTOR_CRC32,
            Algorithm::Crc64 => SELECTOR_CRC64,
            Algorithm::Sha256 => SELECTOR_SHA256,
            Algorithm::Sha256Truncated => SELECTOR_SHA256_TRUNCATED,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when an algorithm name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown algorithm name {0:?}")]
pub struct ParseAlgorithmError(String);

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        [
            Algorithm::Default,
            Algorithm::Crc32,
            Algorithm::Crc64,
            Algorithm::Sha256,
            Algorithm::Sha256Truncated,
        ]
        .into_iter()
        .find(|a| a.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| ParseAlgorithmError(s.to_owned()))
    }
}
