//! Streaming construction of the fs-verity Merkle tree.
//!
//! Data blocks are read in file order and pushed through a stack of per-level block
//! buffers. Whenever a buffer fills up, the hash of its contents (prefixed by the
//! padded salt) is appended to the buffer one level up, and so on until a single
//! digest lands in the root sink. The tree itself is never materialized; memory use
//! is one block per level.

use std::io::Read;

use crate::config::{HashAlgorithm, MAX_LEVELS};
use crate::error::{Error, Result};
use crate::hash::HashContext;

/// Zero-initialized heap buffer, surfacing allocation failure as [`Error::OutOfMemory`]
/// instead of aborting.
pub(crate) fn zalloc(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    buf.resize(len, 0);
    Ok(buf)
}

fn round_up(n: usize, to: usize) -> usize {
    n.div_ceil(to) * to
}

/// A block-sized byte region with a fill watermark.
///
/// For every buffer above the data slot, `filled` is always a multiple of the digest
/// size, and never exceeds the block size.
struct BlockBuffer {
    data: Vec<u8>,
    filled: usize,
}

/// Index of the buffer that stages raw data blocks, one below the interior tree levels.
const DATA_SLOT: usize = 0;

/// The per-level buffer stack.
///
/// `buffers[DATA_SLOT]` stages incoming data; `buffers[1..]` are the interior tree
/// levels, bottom-up. One slot above the top interior level sits the root sink, which
/// aliases the caller's output region (in practice: the `root_hash` field of the
/// descriptor) rather than an owned buffer.
struct TreeBuilder<'a> {
    ctx: &'a mut dyn HashContext,
    digest_size: usize,
    block_size: usize,
    /// Salt zero-extended to the hash primitive's block size; empty when unsalted.
    padded_salt: Vec<u8>,
    buffers: Vec<BlockBuffer>,
    root: &'a mut [u8],
    root_filled: usize,
}

impl TreeBuilder<'_> {
    fn num_levels(&self) -> usize {
        self.buffers.len() - 1
    }

    /// Hashes the (zero-padded) block in `slot` and appends the digest to the buffer
    /// one slot up, or to the root sink above the top level.
    ///
    /// Returns true if the destination can no longer take another digest without
    /// exceeding the block size, i.e. it must itself be hashed upward next.
    fn hash_one_block(&mut self, slot: usize) -> Result<bool> {
        let digest_size = self.digest_size;
        let (head, tail) = self.buffers.split_at_mut(slot + 1);
        let cur = &mut head[slot];

        // Zero-pad the block if it's shorter than block_size.
        cur.data[cur.filled..].fill(0);

        self.ctx.init();
        if !self.padded_salt.is_empty() {
            self.ctx.update(&self.padded_salt);
        }
        self.ctx.update(&cur.data);
        cur.filled = 0;

        let filled = match tail.first_mut() {
            Some(next) => {
                // A resting level always has room for one more digest; levels are
                // hashed upward the moment they fill.
                self.ctx
                    .finalize_into(&mut next.data[next.filled..next.filled + digest_size]);
                next.filled += digest_size;
                next.filled
            }
            None => {
                let dst = self
                    .root
                    .get_mut(self.root_filled..self.root_filled + digest_size)
                    .ok_or_else(|| Error::invalid("merkle tree root sink overflow"))?;
                self.ctx.finalize_into(dst);
                self.root_filled += digest_size;
                self.root_filled
            }
        };

        Ok(filled + digest_size > self.block_size)
    }

    fn build<R: Read>(mut self, reader: &mut R, file_size: u64) -> Result<()> {
        // Hash each data block, also hashing tree blocks as they fill up.
        let mut offset = 0u64;
        while offset < file_size {
            let n = (self.block_size as u64).min(file_size - offset) as usize;
            let data = &mut self.buffers[DATA_SLOT];
            reader.read_exact(&mut data.data[..n]).map_err(Error::Io)?;
            data.filled = n;

            let mut slot = DATA_SLOT;
            while self.hash_one_block(slot)? {
                slot += 1;
                if slot > self.num_levels() {
                    return Err(Error::invalid("merkle tree level overflow"));
                }
            }
            offset += self.block_size as u64;
        }

        // Finish all nonempty pending tree blocks, propagating them upward with
        // zero-padding. The last write lands in the root sink.
        for slot in 1..=self.num_levels() {
            if self.buffers[slot].filled != 0 {
                self.hash_one_block(slot)?;
            }
        }

        if self.root_filled != self.digest_size {
            return Err(Error::invalid("merkle tree root hash was not produced"));
        }
        Ok(())
    }
}

/// Computes the file's Merkle tree root hash into `root_hash`, which must be exactly
/// the algorithm's digest size.
///
/// Reads occur strictly in increasing offset order, each for exactly
/// `min(block_size, remaining)` bytes. For an empty file the root hash is defined as
/// all zeroes and no reads are issued.
pub(crate) fn compute_root_hash<R: Read>(
    reader: &mut R,
    file_size: u64,
    ctx: &mut dyn HashContext,
    alg: HashAlgorithm,
    block_size: usize,
    salt: &[u8],
    root_hash: &mut [u8],
) -> Result<()> {
    if file_size == 0 {
        root_hash.fill(0);
        return Ok(());
    }

    let digest_size = alg.digest_size();
    let hashes_per_block = block_size / digest_size;

    // The salt is zero-extended to the hash primitive's own block size. The padding is
    // part of the format, not an optimization, and it is prepended to every hashed
    // block at every level. An empty salt contributes nothing at all.
    let padded_salt = if salt.is_empty() {
        Vec::new()
    } else {
        let mut buf = zalloc(round_up(salt.len(), alg.inner_block_size()))?;
        buf[..salt.len()].copy_from_slice(salt);
        buf
    };

    // Compute the number of interior levels.
    let mut num_levels = 0usize;
    let mut blocks = file_size.div_ceil(block_size as u64);
    while blocks > 1 {
        if num_levels >= MAX_LEVELS {
            return Err(Error::invalid(format!(
                "too many merkle tree levels for file size {file_size}"
            )));
        }
        blocks = blocks.div_ceil(hashes_per_block as u64);
        num_levels += 1;
    }

    log::debug!(
        "merkle tree over {file_size} bytes: {num_levels} interior level(s), \
         block size {block_size}, {hashes_per_block} hashes per block"
    );

    let mut buffers = Vec::new();
    buffers
        .try_reserve_exact(num_levels + 1)
        .map_err(|_| Error::OutOfMemory)?;
    for _ in 0..=num_levels {
        buffers.push(BlockBuffer {
            data: zalloc(block_size)?,
            filled: 0,
        });
    }

    TreeBuilder {
        ctx,
        digest_size,
        block_size,
        padded_salt,
        buffers,
        root: root_hash,
        root_filled: 0,
    }
    .build(reader, file_size)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read};

    use sha2::{Digest, Sha256};

    use super::*;

    /// A data source that must never be consulted.
    struct PanicReader;

    impl Read for PanicReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            panic!("data source consulted unexpectedly");
        }
    }

    fn sha256_root(content: &[u8], salt: &[u8], block_size: usize) -> [u8; 32] {
        let alg = HashAlgorithm::Sha256;
        let mut ctx = alg.create_ctx();
        let mut root = [0u8; 32];
        compute_root_hash(
            &mut Cursor::new(content),
            content.len() as u64,
            ctx.as_mut(),
            alg,
            block_size,
            salt,
            &mut root,
        )
        .unwrap();
        root
    }

    #[test]
    fn empty_file_has_zero_root_and_reads_nothing() {
        let alg = HashAlgorithm::Sha256;
        let mut ctx = alg.create_ctx();
        let mut root = [0xau8; 32];
        compute_root_hash(&mut PanicReader, 0, ctx.as_mut(), alg, 4096, &[], &mut root).unwrap();
        assert_eq!(root, [0u8; 32]);
    }

    #[test]
    fn single_block_root_is_the_padded_block_hash() {
        let content = b"hello fs-verity";
        let mut block = [0u8; 4096];
        block[..content.len()].copy_from_slice(content);
        assert_eq!(sha256_root(content, &[], 4096)[..], Sha256::digest(block)[..]);
    }

    #[test]
    fn exact_block_needs_no_padding() {
        let content = vec![0x5au8; 4096];
        assert_eq!(
            sha256_root(&content, &[], 4096)[..],
            Sha256::digest(&content)[..]
        );
    }

    #[test]
    fn salted_block_is_prefixed_with_padded_salt() {
        let salt = [0xabu8; 5];
        let content = vec![0x42u8; 4096];
        let mut padded = [0u8; 64];
        padded[..salt.len()].copy_from_slice(&salt);
        let mut hasher = Sha256::new();
        hasher.update(padded);
        hasher.update(&content);
        assert_eq!(sha256_root(&content, &salt, 4096)[..], hasher.finalize()[..]);
    }

    #[test]
    fn two_blocks_hash_into_one_interior_level() {
        let content = vec![7u8; 8192];
        let mut interior = [0u8; 4096];
        interior[..32].copy_from_slice(&Sha256::digest(&content[..4096]));
        interior[32..64].copy_from_slice(&Sha256::digest(&content[4096..]));
        assert_eq!(
            sha256_root(&content, &[], 4096)[..],
            Sha256::digest(interior)[..]
        );
    }

    #[test]
    fn level_boundary_still_produces_one_root() {
        // 128 data blocks fill an interior block exactly; 129 straddle into a second
        // one and force a second interior level.
        let exact = vec![1u8; 128 * 4096];
        let straddle = vec![1u8; 129 * 4096];
        assert_ne!(sha256_root(&exact, &[], 4096), sha256_root(&straddle, &[], 4096));
    }

    #[test]
    fn read_sizes_follow_the_block_contract() {
        struct RecordingReader {
            inner: Cursor<Vec<u8>>,
            sizes: Vec<usize>,
        }

        impl Read for RecordingReader {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.sizes.push(buf.len());
                self.inner.read(buf)
            }
        }

        let len = 2 * 4096 + 100;
        let mut reader = RecordingReader {
            inner: Cursor::new(vec![3u8; len]),
            sizes: Vec::new(),
        };
        let alg = HashAlgorithm::Sha256;
        let mut ctx = alg.create_ctx();
        let mut root = [0u8; 32];
        compute_root_hash(&mut reader, len as u64, ctx.as_mut(), alg, 4096, &[], &mut root)
            .unwrap();
        assert_eq!(reader.sizes, vec![4096, 4096, 100]);
    }

    #[test]
    fn short_source_is_an_io_error() {
        let alg = HashAlgorithm::Sha256;
        let mut ctx = alg.create_ctx();
        let mut root = [0u8; 32];
        let mut reader = Cursor::new(vec![0u8; 100]);
        let err = compute_root_hash(&mut reader, 8192, ctx.as_mut(), alg, 4096, &[], &mut root)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
