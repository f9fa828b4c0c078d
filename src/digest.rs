//! Computation of the fs-verity measurement: parameter validation, descriptor
//! construction, and the final descriptor hash.

use std::fmt;
use std::io::Read;

use crate::config::{HashAlgorithm, DEFAULT_BLOCK_SIZE, DESCRIPTOR_SIZE, MAX_SALT_SIZE};
use crate::error::{Error, Result};
use crate::tree::{self, zalloc};

/// Caller-provided Merkle tree configuration for [`compute_digest`].
///
/// The defaults (version 1, SHA-256, 4096-byte blocks, no salt) match what the kernel
/// and the `fsverity` tools use, so most callers only need to fill in `file_size`:
///
/// ```
/// use fsverity_digest::MerkleTreeParams;
///
/// let params = MerkleTreeParams { file_size: 100000, ..Default::default() };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct MerkleTreeParams<'a> {
    /// Format version; must be 1.
    pub version: u32,
    /// Numeric hash algorithm id in the kernel API numbering (see [`HashAlgorithm`]).
    pub hash_algorithm: u8,
    /// Merkle tree block size in bytes. Must be a power of two with room for at least
    /// two digests.
    pub block_size: u32,
    /// Salt prepended (zero-extended to the hash primitive's block size) to every
    /// hashed block. At most [`MAX_SALT_SIZE`] bytes; empty means unsalted.
    pub salt: &'a [u8],
    /// Size in bytes of the data the tree is built over.
    pub file_size: u64,
    /// Must be all zero.
    pub reserved: [u64; 8],
}

impl Default for MerkleTreeParams<'_> {
    fn default() -> Self {
        Self {
            version: 1,
            hash_algorithm: HashAlgorithm::default() as u8,
            block_size: DEFAULT_BLOCK_SIZE,
            salt: &[],
            file_size: 0,
            reserved: [0; 8],
        }
    }
}

/// An fs-verity measurement: the digest of the descriptor embedding the Merkle root.
///
/// Matches the `fsverity_digest` record of the kernel API: an algorithm id, a size,
/// and `digest_size` bytes of digest. The [`fmt::Display`] form is `<algorithm>:<hex>`,
/// e.g. `sha256:3d248c…`, as printed by the `fsverity` tools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsVerityDigest {
    /// The Merkle tree hash algorithm the measurement was computed with.
    pub algorithm: HashAlgorithm,
    /// The measurement bytes; length equals the algorithm's digest size.
    pub digest: Box<[u8]>,
}

impl FsVerityDigest {
    /// The algorithm id as carried in the kernel's `fsverity_digest` record.
    pub fn digest_algorithm(&self) -> u16 {
        self.algorithm as u16
    }

    /// The digest length in bytes.
    pub fn digest_size(&self) -> u16 {
        self.digest.len() as u16
    }
}

impl fmt::Display for FsVerityDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, hex::encode(&self.digest))
    }
}

// Descriptor byte layout. 256 bytes, little-endian fields, reserved tail all zero.
const DESC_DATA_SIZE: usize = 8; // ..16
const DESC_ROOT_HASH: usize = 16; // ..80, zero-padded right
const DESC_SALT: usize = 80; // ..112, zero-padded right

/// Computes the fs-verity measurement of `file_size` bytes pulled from `reader`.
///
/// The reader is consulted strictly in increasing offset order, once per data block,
/// for exactly `min(block_size, remaining)` bytes, and must produce them in full; it
/// is not consulted at all if validation fails or `file_size` is zero. All failures
/// are returned verbatim with no partial digest.
pub fn compute_digest<R: Read>(mut reader: R, params: &MerkleTreeParams<'_>) -> Result<FsVerityDigest> {
    if params.version != 1 {
        return Err(Error::invalid(format!(
            "unsupported version ({})",
            params.version
        )));
    }
    if !params.block_size.is_power_of_two() {
        return Err(Error::invalid(format!(
            "unsupported block size ({})",
            params.block_size
        )));
    }
    if params.salt.len() > MAX_SALT_SIZE {
        return Err(Error::invalid(format!(
            "unsupported salt size ({})",
            params.salt.len()
        )));
    }
    if params.reserved.iter().any(|&word| word != 0) {
        return Err(Error::invalid("reserved bits set in merkle tree params"));
    }
    let alg = HashAlgorithm::from_id(params.hash_algorithm).ok_or_else(|| {
        Error::invalid(format!("unknown hash algorithm: {}", params.hash_algorithm))
    })?;

    let digest_size = alg.digest_size();
    let block_size = params.block_size as usize;
    // The tree can only narrow if a block holds at least two digests.
    if block_size < digest_size * 2 {
        return Err(Error::invalid(format!(
            "unsupported block size ({})",
            params.block_size
        )));
    }

    let mut ctx = alg.create_ctx();

    let mut desc = [0u8; DESCRIPTOR_SIZE];
    desc[0] = 1; // version
    desc[1] = params.hash_algorithm;
    desc[2] = params.block_size.trailing_zeros() as u8; // log2 of the block size
    desc[3] = params.salt.len() as u8;
    // bytes 4..8 are sig_size, always zero in the measured descriptor
    desc[DESC_DATA_SIZE..DESC_ROOT_HASH].copy_from_slice(&params.file_size.to_le_bytes());
    desc[DESC_SALT..DESC_SALT + params.salt.len()].copy_from_slice(params.salt);

    // The builder writes the root hash in place; the measurement is then a single
    // hash over the completed 256-byte descriptor.
    tree::compute_root_hash(
        &mut reader,
        params.file_size,
        ctx.as_mut(),
        alg,
        block_size,
        params.salt,
        &mut desc[DESC_ROOT_HASH..DESC_ROOT_HASH + digest_size],
    )?;

    let mut digest = zalloc(digest_size)?;
    ctx.hash_full(&desc, &mut digest);

    Ok(FsVerityDigest {
        algorithm: alg,
        digest: digest.into_boxed_slice(),
    })
}
