use std::io::{self, Read};

use log::{debug, trace};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::algorithm::Algorithm;
use crate::codec;
use crate::error::{Error, Result};
use crate::salt::{Salt, SaltKind, SaltOrigin};

/// Chunk size used when hashing a reader.
pub const BUFFER_SIZE: usize = 4096;

/// HashContext binds one resolved algorithm to one resolved salt.
///
/// Both are fixed at construction. Digests are computed over `salt ++ input`.
/// The context is live until [`HashContext::dispose`] is called; after that every
/// operation fails with [`Error::UseAfterFree`] and a second dispose fails with
/// [`Error::DoubleFree`].
///
/// Reads (`length`, `do_hash`, `try_clone`) only need `&self`, so a live context can
/// be shared across threads. `dispose` takes `&mut self`, which rules out running it
/// alongside any other operation on the same context.
#[derive(Debug)]
pub struct HashContext {
    algorithm: Algorithm,
    salt: Salt,
    disposed: bool,
}

impl HashContext {
    /// new resolves the algorithm, then the salt, and returns a live context.
    ///
    /// A salt resolution failure leaves nothing behind.
    pub fn new(algorithm: Algorithm, salt: SaltKind) -> Result<HashContext> {
        Self::new_with_rng(algorithm, salt, &mut OsRng)
    }

    /// new_with_rng is [`HashContext::new`] drawing a `Random` salt from `rng`.
    pub fn new_with_rng<R: RngCore + CryptoRng>(
        algorithm: Algorithm,
        salt: SaltKind,
        rng: &mut R,
    ) -> Result<HashContext> {
        let algorithm = algorithm.resolve();
        let salt = salt.resolve_with(rng)?;
        debug!(
            "new context: algorithm {}, {} salt of {} bytes",
            algorithm,
            salt.origin(),
            salt.len()
        );
        Ok(HashContext {
            algorithm,
            salt,
            disposed: false,
        })
    }

    /// from_raw builds a context from binding-level selector and salt kind values.
    pub fn from_raw(algorithm: u8, salt_kind: u8, salt_material: Option<&[u8]>) -> Result<Self> {
        let algorithm = Algorithm::try_from(algorithm)?;
        let salt = SaltKind::from_raw(salt_kind, salt_material)?;
        Self::new(algorithm, salt)
    }

    /// The concrete algorithm. Never [`Algorithm::Default`].
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The resolved salt bytes. Empty once the context is disposed.
    pub fn salt(&self) -> &[u8] {
        self.salt.bytes()
    }

    /// Which salt descriptor the context was built from.
    pub fn salt_origin(&self) -> SaltOrigin {
        self.salt.origin()
    }

    /// Whether the context has not been disposed.
    pub fn is_live(&self) -> bool {
        !self.disposed
    }

    fn check_live(&self) -> Result<()> {
        if self.disposed {
            return Err(Error::UseAfterFree);
        }
        Ok(())
    }

    /// try_clone returns an independent context with the same algorithm and salt bytes.
    ///
    /// A `Random` salt is copied, not drawn again, so both contexts produce the same digests.
    pub fn try_clone(&self) -> Result<HashContext> {
        self.check_live()?;
        debug!("clone context: algorithm {}", self.algorithm);
        Ok(HashContext {
            algorithm: self.algorithm,
            salt: self.salt.clone(),
            disposed: false,
        })
    }

    /// length returns the text length `do_hash` would produce for `input`.
    ///
    /// Every supported algorithm has a fixed width, so the input is not inspected.
    pub fn length(&self, _input: &[u8]) -> Result<usize> {
        self.check_live()?;
        Ok(codec::digest_len(self.algorithm))
    }

    /// digest returns the raw digest bytes of `salt ++ input`.
    pub fn digest(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.check_live()?;
        trace!("{} over {} input bytes", self.algorithm, input.len());
        let mut h = self.algorithm.hasher();
        h.update(self.salt.bytes());
        h.update(input);
        Ok(h.finalize())
    }

    /// do_hash returns the lowercase hex digest of `salt ++ input`.
    pub fn do_hash(&self, input: &[u8]) -> Result<String> {
        self.digest(input).map(|raw| codec::encode(&raw))
    }

    /// digest_reader is [`HashContext::digest`] over everything `input` yields.
    pub fn digest_reader<R: Read>(&self, mut input: R) -> Result<Vec<u8>> {
        self.check_live()?;
        let mut h = self.algorithm.hasher();
        h.update(self.salt.bytes());

        let mut buffer = [0u8; BUFFER_SIZE];
        let mut total = 0usize;
        loop {
            let read = match input.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            h.update(&buffer[..read]);
            total += read;
        }
        trace!("{} over {} streamed bytes", self.algorithm, total);
        Ok(h.finalize())
    }

    /// hash_reader is [`HashContext::do_hash`] over everything `input` yields.
    pub fn hash_reader<R: Read>(&self, input: R) -> Result<String> {
        self.digest_reader(input).map(|raw| codec::encode(&raw))
    }

    /// dispose wipes the salt and marks the context unusable.
    pub fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Err(Error::DoubleFree);
        }
        self.salt.zeroize();
        self.disposed = true;
        debug!("disposed context: algorithm {}", self.algorithm);
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::algorithm::*;
    use crate::salt::{DEFAULT_SALT, RANDOM_SALT_LEN};
    use anyhow::Result;
    use proptest::collection::vec as pvec;
    use proptest::prelude::*;
    use sha3::{
        digest::{ExtendableOutput, XofReader},
        Shake256,
    };

    const CONCRETE: [Algorithm; 4] = [
        Algorithm::Crc32,
        Algorithm::Crc64,
        Algorithm::Sha256,
        Algorithm::Sha256Truncated,
    ];

    fn shake_input(seed: &str, len: usize) -> Vec<u8> {
        let mut input = vec![0; len];
        let mut v = Shake256::default();
        v.write_all(seed.as_bytes()).unwrap();
        XofReader::read(&mut v.finalize_xof(), &mut input);
        input
    }

    #[test]
    fn crc32_unsalted() -> Result<()> {
        let ctx = HashContext::new(Algorithm::Crc32, SaltKind::None)?;
        assert_eq!(ctx.length(b"abc")?, 8);
        assert_eq!(ctx.do_hash(b"abc")?, "352441c2");
        Ok(())
    }

    #[test]
    fn default_algorithm_with_pepper() -> Result<()> {
        let ctx = HashContext::new(Algorithm::Default, SaltKind::Specific(b"pepper".to_vec()))?;
        assert_eq!(ctx.algorithm(), Algorithm::Sha256Truncated);
        assert_eq!(ctx.do_hash(b"hello")?, "711394d33945fda4");
        Ok(())
    }

    #[test]
    fn salt_is_prepended() -> Result<()> {
        let salted = HashContext::new(Algorithm::Crc32, SaltKind::Specific(b"salt".to_vec()))?;
        assert_eq!(salted.do_hash(b"abc")?, "f1befc60");

        let salted = HashContext::new(Algorithm::Crc64, SaltKind::Specific(b"salt".to_vec()))?;
        assert_eq!(salted.do_hash(b"abc")?, "c84046673dffec30");

        let default = HashContext::new(Algorithm::Crc32, SaltKind::Default)?;
        assert_eq!(default.salt(), &DEFAULT_SALT[..]);
        assert_eq!(default.do_hash(b"abc")?, "a4710fb6");
        Ok(())
    }

    #[test]
    fn default_salt_default_algorithm() -> Result<()> {
        let ctx = HashContext::new(Algorithm::Default, SaltKind::Default)?;
        assert_eq!(ctx.do_hash(b"hello world!")?, "ec271e9a5d7f4d75");
        Ok(())
    }

    #[test]
    fn empty_specific_salt_is_unsalted() -> Result<()> {
        let none = HashContext::new(Algorithm::Sha256, SaltKind::None)?;
        let empty = HashContext::new(Algorithm::Sha256, SaltKind::Specific(vec![]))?;
        assert_eq!(none.do_hash(b"abc")?, empty.do_hash(b"abc")?);
        assert_eq!(empty.salt_origin(), SaltOrigin::Specific);
        Ok(())
    }

    #[test]
    fn construction_failure() {
        let err = HashContext::from_raw(9, 0, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(9)));

        // algorithm is checked before the salt
        let err = HashContext::from_raw(9, 2, None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(9)));

        let err = HashContext::from_raw(1, 2, None).unwrap_err();
        assert!(matches!(err, Error::InvalidSalt(_)));
    }

    #[test]
    fn random_salt_is_stable_per_context() -> Result<()> {
        let a = HashContext::new(Algorithm::Sha256, SaltKind::Random)?;
        let b = HashContext::new(Algorithm::Sha256, SaltKind::Random)?;
        assert_eq!(a.salt().len(), RANDOM_SALT_LEN);

        assert_eq!(a.do_hash(b"input")?, a.do_hash(b"input")?);
        assert_ne!(a.do_hash(b"input")?, b.do_hash(b"input")?);

        let a2 = a.try_clone()?;
        assert_eq!(a.do_hash(b"input")?, a2.do_hash(b"input")?);
        Ok(())
    }

    #[test]
    fn clone_survives_dispose() -> Result<()> {
        let mut ctx = HashContext::new(Algorithm::Crc64, SaltKind::Default)?;
        let clone = ctx.try_clone()?;
        let before = ctx.do_hash(b"payload")?;

        ctx.dispose()?;
        assert!(!ctx.is_live());
        assert!(clone.is_live());
        assert_eq!(clone.do_hash(b"payload")?, before);
        Ok(())
    }

    #[test]
    fn use_after_free() -> Result<()> {
        let mut ctx = HashContext::new(Algorithm::Sha256, SaltKind::Specific(b"s".to_vec()))?;
        ctx.dispose()?;
        assert!(ctx.salt().is_empty());

        assert!(matches!(ctx.length(b"x"), Err(Error::UseAfterFree)));
        assert!(matches!(ctx.do_hash(b"x"), Err(Error::UseAfterFree)));
        assert!(matches!(ctx.digest(b"x"), Err(Error::UseAfterFree)));
        assert!(matches!(
            ctx.hash_reader(Cursor::new(b"x")),
            Err(Error::UseAfterFree)
        ));
        assert!(matches!(ctx.try_clone(), Err(Error::UseAfterFree)));
        assert!(matches!(ctx.dispose(), Err(Error::DoubleFree)));
        Ok(())
    }

    #[test]
    fn reader_matches_slice() -> Result<()> {
        // spans several buffer lengths
        let input = shake_input("khash input", 3 * BUFFER_SIZE + 17);
        for a in CONCRETE {
            let ctx = HashContext::new(a, SaltKind::Specific(b"pepper".to_vec()))?;
            assert_eq!(ctx.hash_reader(Cursor::new(&input))?, ctx.do_hash(&input)?);
        }
        Ok(())
    }

    #[test]
    fn reader_error() -> Result<()> {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let ctx = HashContext::new(Algorithm::Crc32, SaltKind::None)?;
        assert!(matches!(ctx.hash_reader(Broken), Err(Error::Io(_))));
        Ok(())
    }

    #[test]
    fn shared_across_threads() -> Result<()> {
        let ctx = HashContext::new(Algorithm::Sha256, SaltKind::Random)?;
        let expected = ctx.do_hash(b"concurrent")?;

        std::thread::scope(|s| {
            let shared = &ctx;
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(move || shared.do_hash(b"concurrent").unwrap()))
                .collect();
            for h in handles {
                assert_eq!(h.join().unwrap(), expected);
            }

            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let mut own = ctx.try_clone().unwrap();
                    s.spawn(move || {
                        let out = own.do_hash(b"concurrent").unwrap();
                        own.dispose().unwrap();
                        out
                    })
                })
                .collect();
            for w in workers {
                assert_eq!(w.join().unwrap(), expected);
            }
        });
        assert!(ctx.is_live());
        Ok(())
    }

    proptest! {
        #[test]
        fn length_matches_digest(
            selector in 0u8..=4,
            salt in pvec(any::<u8>(), 0..64),
            input in pvec(any::<u8>(), 0..512),
        ) {
            let ctx = HashContext::from_raw(selector, 2, Some(salt.as_slice())).unwrap();
            let len = ctx.length(&input).unwrap();
            prop_assert_eq!(len, 2 * ctx.algorithm().output_width());
            prop_assert_eq!(ctx.do_hash(&input).unwrap().len(), len);
        }

        #[test]
        fn deterministic_and_clone_equivalent(
            selector in 0u8..=4,
            salt in pvec(any::<u8>(), 0..64),
            input in pvec(any::<u8>(), 0..512),
        ) {
            let ctx = HashContext::from_raw(selector, 2, Some(salt.as_slice())).unwrap();
            let clone = ctx.try_clone().unwrap();
            let first = ctx.do_hash(&input).unwrap();
            prop_assert_eq!(&first, &ctx.do_hash(&input).unwrap());
            prop_assert_eq!(&first, &clone.do_hash(&input).unwrap());
        }

        #[test]
        fn salt_changes_output(
            selector in prop::sample::select(vec![1u8, 2, 3, 4]),
            salt in pvec(any::<u8>(), 1..64),
            input in pvec(any::<u8>(), 0..512),
        ) {
            let unsalted = HashContext::from_raw(selector, 0, None).unwrap();
            let salted = HashContext::from_raw(selector, 2, Some(salt.as_slice())).unwrap();
            // CRC32 collides on distinct inputs about once in 2^32 cases
            prop_assert_ne!(unsalted.do_hash(&input).unwrap(), salted.do_hash(&input).unwrap());
        }
    }
}
