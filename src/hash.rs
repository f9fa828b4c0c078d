//! Stateful hash contexts behind the [`HashAlgorithm`] registry.
//!
//! The Merkle tree builder and the measurement composer both drive a single
//! [`HashContext`] through many init/update/finalize cycles, so the trait is
//! object safe and contexts are handed out boxed by [`HashAlgorithm::create_ctx`].

use sha2::digest;
use digest::crypto_common::BlockSizeUser;
use digest::{Digest, FixedOutputReset};
use sha2::{Sha256, Sha512};

use crate::config::HashAlgorithm;

/// A stateful incremental hasher with a single-linear-use contract:
/// `init`, any number of `update` calls, then `finalize_into`.
///
/// `finalize_into` leaves the context reset, so a fresh `init` is optional between uses.
/// Contexts are not meant to be shared; at most one caller uses a context at a time.
pub trait HashContext {
    /// Resets the internal state, discarding any data fed so far.
    fn init(&mut self);

    /// Feeds data into the hash state. May be called any number of times.
    fn update(&mut self, data: &[u8]);

    /// Writes the digest into `out` and resets the state.
    ///
    /// `out` must be exactly the algorithm's digest size.
    fn finalize_into(&mut self, out: &mut [u8]);

    /// One-shot convenience: `init`, `update(data)`, `finalize_into(out)`.
    fn hash_full(&mut self, data: &[u8], out: &mut [u8]) {
        self.init();
        self.update(data);
        self.finalize_into(out);
    }
}

/// Adapter from the RustCrypto digest traits to [`HashContext`].
struct Sha2Context<D>(D);

impl<D> HashContext for Sha2Context<D>
where
    D: Digest + FixedOutputReset,
{
    fn init(&mut self) {
        Digest::reset(&mut self.0);
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize_into(&mut self, out: &mut [u8]) {
        let digest = Digest::finalize_reset(&mut self.0);
        out.copy_from_slice(digest.as_slice());
    }
}

impl HashAlgorithm {
    /// The size in bytes of the digests produced by this hash algorithm.
    pub fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => Sha256::output_size(),
            HashAlgorithm::Sha512 => Sha512::output_size(),
        }
    }

    /// The native input block size of the hash primitive (in bytes).
    ///
    /// This is *not* the Merkle tree block size: it is the compression block size the
    /// salt gets zero-extended to before being prepended to every hashed block.
    pub fn inner_block_size(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => Sha256::block_size(),
            HashAlgorithm::Sha512 => Sha512::block_size(),
        }
    }

    /// Creates a fresh hash context for this algorithm.
    pub fn create_ctx(self) -> Box<dyn HashContext> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha2Context(Sha256::new())),
            HashAlgorithm::Sha512 => Box::new(Sha2Context(Sha512::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_the_primitives() {
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
        assert_eq!(HashAlgorithm::Sha256.inner_block_size(), 64);
        assert_eq!(HashAlgorithm::Sha512.inner_block_size(), 128);
    }

    #[test]
    fn context_matches_one_shot_hashing() {
        let mut ctx = HashAlgorithm::Sha256.create_ctx();
        let mut out = [0u8; 32];
        ctx.init();
        ctx.update(b"hello ");
        ctx.update(b"world");
        ctx.finalize_into(&mut out);
        assert_eq!(out[..], Sha256::digest(b"hello world")[..]);
    }

    #[test]
    fn context_is_reusable_after_finalize() {
        let mut ctx = HashAlgorithm::Sha512.create_ctx();
        let mut first = [0u8; 64];
        let mut second = [0u8; 64];
        ctx.hash_full(b"abc", &mut first);
        // finalize resets, so no explicit init is needed in between
        ctx.update(b"abc");
        ctx.finalize_into(&mut second);
        assert_eq!(first, second);
        assert_eq!(first[..], Sha512::digest(b"abc")[..]);
    }
}
