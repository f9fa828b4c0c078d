use num_enum::TryFromPrimitive;

/// Maximum size of digests, as described [in the Linux kernel documentation](https://www.kernel.org/doc/html/latest/filesystems/fsverity.html#fs-verity-descriptor).
///
/// This is also the size of the `root_hash` field of the descriptor; shorter digests are
/// zero-padded on the right.
pub const MAX_DIGEST_SIZE: usize = 64;

/// Maximum size of salts, as described [in the Linux kernel documentation](https://www.kernel.org/doc/html/latest/filesystems/fsverity.html#fs-verity-descriptor)
pub const MAX_SALT_SIZE: usize = 32;

/// Maximum number of interior Merkle tree levels, matching `FS_VERITY_MAX_LEVELS` in
/// `fsverity-utils`. Unreachable in practice: even at the minimum tree arity of two
/// hashes per block, a `u64` file size tops out below 60 levels.
pub const MAX_LEVELS: usize = 64;

/// Currently the kernel requires the `fs-verity` block size to be equal to the system page size,
/// which is usually 4096. Some modern 64 bit ARM systems have a larger page size though.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Size of the fs-verity descriptor in bytes. The measurement is the hash of exactly this
/// many bytes; the variable-length signature trailer of the on-disk format is never included.
pub const DESCRIPTOR_SIZE: usize = 256;

/// Enum of the supported Merkle tree hash algorithms.
///
/// The [`Default`] value is `Sha256`, corresponding to the default hash algorithm in the
/// `fsverity` tools.
///
/// This enum supports conversion to string using [`std::fmt::Display`] and from a string using
/// [`parse_display::FromStr`].
///
/// It also supports conversion to integer using `as u8` and from integer using
/// [`HashAlgorithm::from_id`] (backed by [`TryFromPrimitive`]). The integer values match the
/// hash algorithm numbering used in the fsverity kernel API.
#[derive(Copy, Clone, PartialEq, Eq, parse_display::FromStr, parse_display::Display, Debug, TryFromPrimitive)]
#[display(style = "lowercase")]
#[repr(u8)]
pub enum HashAlgorithm {
    /// As string: `sha256`. As number: `FS_VERITY_HASH_ALG_SHA256` from the kernel API.
    Sha256 = 1,

    /// As string: `sha512`. As number: `FS_VERITY_HASH_ALG_SHA512` from the kernel API.
    Sha512 = 2,
}

impl HashAlgorithm {
    /// Looks up an algorithm by its numeric id in the kernel API numbering.
    ///
    /// Returns `None` for ids this crate does not implement; [`compute_digest`](crate::compute_digest)
    /// turns that into an [`Error::InvalidArgument`](crate::Error::InvalidArgument) naming the
    /// offending id.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::try_from(id).ok()
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        assert_eq!(HashAlgorithm::from_id(1), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_id(2), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_id(0), None);
        assert_eq!(HashAlgorithm::from_id(3), None);
        assert_eq!(HashAlgorithm::from_id(255), None);
    }

    #[test]
    fn names_roundtrip() {
        assert_eq!(HashAlgorithm::Sha256.to_string(), "sha256");
        assert_eq!(HashAlgorithm::Sha512.to_string(), "sha512");
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!("sha1".parse::<HashAlgorithm>().is_err());
    }
}
