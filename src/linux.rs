//! Access to the kernel's `fs-verity` interface through the `ioctl`s documented at
//! <https://www.kernel.org/doc/html/latest/filesystems/fsverity.html>.

use std::io;
use std::os::unix::prelude::AsRawFd;

use crate::config::{HashAlgorithm, MAX_DIGEST_SIZE};
use crate::digest::FsVerityDigest;

// FIXME these are calculated through complex macros that bindgen doesn't like.
//       it's also possible they are not the same on all architectures.
//       should really check this!!!
const FS_IOC_ENABLE_VERITY: u64 = 1082156677;
const FS_IOC_MEASURE_VERITY: u64 = 3221513862;

/// Enables `fs-verity` on the file, making it immutable and having the kernel build and
/// store its Merkle tree.
///
/// The file must be on a filesystem with verity support, opened read-only, and have no
/// other writable file descriptors. See
/// <https://www.kernel.org/doc/html/latest/filesystems/fsverity.html#fs-ioc-enable-verity>
pub fn fsverity_enable(
    fd: impl AsRawFd,
    block_size: u32,
    algorithm: HashAlgorithm,
    salt: &[u8],
) -> io::Result<()> {
    let fd = fd.as_raw_fd();

    #[allow(non_camel_case_types)]
    #[repr(C)]
    struct fsverity_enable_arg {
        version: u32,
        hash_algorithm: u32,
        block_size: u32,
        salt_size: u32,
        salt_ptr: u64,
        sig_size: u32,
        __reserved1: u32,
        sig_ptr: u64,
        __reserved2: [u64; 11],
    }

    let arg = fsverity_enable_arg {
        version: 1,
        hash_algorithm: algorithm as u32,
        block_size,
        salt_size: salt.len() as u32,
        salt_ptr: salt.as_ptr() as u64,
        sig_size: 0,
        __reserved1: 0,
        sig_ptr: 0,
        __reserved2: [0; 11],
    };

    let ret = unsafe { libc::ioctl(fd, FS_IOC_ENABLE_VERITY, &arg as *const _) };
    if ret != 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Fetches the measurement the kernel stores for a verity-enabled file.
///
/// Fails with the kernel's error if verity is not enabled on the file. See
/// <https://www.kernel.org/doc/html/latest/filesystems/fsverity.html#fs-ioc-measure-verity>
pub fn fsverity_measure(fd: impl AsRawFd) -> io::Result<FsVerityDigest> {
    let fd = fd.as_raw_fd();

    #[allow(non_camel_case_types)]
    #[repr(C)]
    struct fsverity_digest {
        digest_algorithm: u16,
        digest_size: u16,
        digest: [u8; MAX_DIGEST_SIZE],
    }

    let mut raw = fsverity_digest {
        digest_algorithm: 0, // unset
        digest_size: MAX_DIGEST_SIZE as u16,
        digest: [0; MAX_DIGEST_SIZE],
    };

    let ret = unsafe { libc::ioctl(fd, FS_IOC_MEASURE_VERITY, &mut raw as *mut _) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    let algorithm = HashAlgorithm::from_id(raw.digest_algorithm as u8).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("kernel reported unknown hash algorithm: {}", raw.digest_algorithm),
        )
    })?;

    Ok(FsVerityDigest {
        algorithm,
        digest: Box::from(&raw.digest[..raw.digest_size as usize]),
    })
}
