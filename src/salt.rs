use std::fmt;

use log::debug;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, InvalidSalt, Result};

/// The embedded salt used by [`SaltKind::Default`].
pub const DEFAULT_SALT: [u8; 32] = [
    0x67, 0x87, 0xf0, 0x49, 0x79, 0x14, 0x66, 0xd5, 0xa3, 0x1a, 0x3a, 0xa6, 0xf7, 0x13, 0x8d, 0x8f,
    0xbb, 0x90, 0x7f, 0xd1, 0x78, 0x57, 0x58, 0x29, 0x8b, 0x5c, 0x97, 0xb0, 0xf3, 0xfb, 0x31, 0xff,
];

/// Number of bytes drawn from the OS for a [`SaltKind::Random`] salt.
pub const RANDOM_SALT_LEN: usize = 32;

/// Longest salt accepted for [`SaltKind::Specific`].
pub const MAX_SALT_LEN: usize = 1024;

const KIND_NONE: u8 = 0;
const KIND_DEFAULT: u8 = 1;
const KIND_SPECIFIC: u8 = 2;
const KIND_RANDOM: u8 = 3;

/// Describes how a context obtains its salt.
#[derive(Clone, PartialEq, Eq)]
pub enum SaltKind {
    /// No salt, the input is hashed as is.
    None,
    /// The embedded [`DEFAULT_SALT`].
    Default,
    /// Caller-provided salt bytes, possibly empty.
    Specific(Vec<u8>),
    /// [`RANDOM_SALT_LEN`] fresh bytes from the OS entropy source.
    Random,
}

impl SaltKind {
    /// from_raw builds a descriptor from a binding-level kind value.
    ///
    /// `material` is only consulted for `Specific`, where it must be present.
    pub fn from_raw(kind: u8, material: Option<&[u8]>) -> Result<Self> {
        match kind {
            KIND_NONE => Ok(SaltKind::None),
            KIND_DEFAULT => Ok(SaltKind::Default),
            KIND_SPECIFIC => material
                .map(|m| SaltKind::Specific(m.to_vec()))
                .ok_or(Error::InvalidSalt(InvalidSalt::MissingMaterial)),
            KIND_RANDOM => Ok(SaltKind::Random),
            other => Err(InvalidSalt::UnknownKind(other).into()),
        }
    }

    /// Whether a binding-level kind value carries caller material.
    pub fn is_specific(kind: u8) -> bool {
        kind == KIND_SPECIFIC
    }

    /// The origin recorded on salts resolved from this descriptor.
    pub fn origin(&self) -> SaltOrigin {
        match self {
            SaltKind::None => SaltOrigin::None,
            SaltKind::Default => SaltOrigin::Default,
            SaltKind::Specific(_) => SaltOrigin::Specific,
            SaltKind::Random => SaltOrigin::Random,
        }
    }

    /// resolve turns the descriptor into concrete salt bytes.
    ///
    /// `Random` draws from the OS exactly once; a failing entropy source is reported,
    /// never replaced by a weaker one.
    pub fn resolve(self) -> Result<Salt> {
        self.resolve_with(&mut OsRng)
    }

    /// resolve_with is [`SaltKind::resolve`] drawing `Random` salts from `rng`.
    pub fn resolve_with<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<Salt> {
        let origin = self.origin();
        let bytes = match self {
            SaltKind::None => Vec::new(),
            SaltKind::Default => DEFAULT_SALT.to_vec(),
            SaltKind::Specific(bytes) => {
                if bytes.len() > MAX_SALT_LEN {
                    return Err(InvalidSalt::TooLong {
                        len: bytes.len(),
                        max: MAX_SALT_LEN,
                    }
                    .into());
                }
                bytes
            }
            SaltKind::Random => {
                let mut bytes = vec![0; RANDOM_SALT_LEN];
                rng.try_fill_bytes(&mut bytes)
                    .map_err(Error::RandomSourceUnavailable)?;
                bytes
            }
        };
        debug!("resolved {} salt of {} bytes", origin, bytes.len());
        Ok(Salt { bytes, origin })
    }
}

// Salt material stays out of logs and panic messages.
impl fmt::Debug for SaltKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaltKind::Specific(bytes) => write!(f, "Specific({} bytes)", bytes.len()),
            other => write!(f, "{}", other.origin()),
        }
    }
}

/// Which descriptor a resolved salt came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SaltOrigin {
    /// [`SaltKind::None`]
    None,
    /// [`SaltKind::Default`]
    Default,
    /// [`SaltKind::Specific`]
    Specific,
    /// [`SaltKind::Random`]
    Random,
}

impl fmt::Display for SaltOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaltOrigin::None => "None",
            SaltOrigin::Default => "Default",
            SaltOrigin::Specific => "Specific",
            SaltOrigin::Random => "Random",
        })
    }
}

/// Resolved salt bytes. The bytes are wiped when the salt is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Salt {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    origin: SaltOrigin,
}

impl Salt {
    /// The raw salt bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The descriptor the bytes were resolved from.
    pub fn origin(&self) -> SaltOrigin {
        self.origin
    }

    /// Number of salt bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the salt has no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salt")
            .field("origin", &self.origin)
            .field("len", &self.bytes.len())
            .finish()
    }
}
