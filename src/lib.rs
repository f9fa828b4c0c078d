//! This crate computes `fs-verity` measurements of file contents in userland Rust code.
//!
//! ## What is `fs-verity`?
//!
//! `fs-verity` is a Linux kernel feature that makes a file permanently immutable and has
//! the kernel maintain a Merkle tree over its contents. The kernel refuses to serve any
//! part of the file that does not match the tree, and can instantly report a single
//! *measurement* for the file: the hash of a small descriptor structure embedding the
//! Merkle tree root hash, the file size, and the tree parameters. As long as you trust
//! the kernel, that measurement always matches the data you read from the file.
//!
//! ## What is this crate?
//!
//! You can think of it as a pure Rust replacement for the digest-computation core of
//! `libfsverity`:
//!
//! * [`compute_digest`] calculates the measurement of any [`std::io::Read`] source given
//!   [`MerkleTreeParams`], without touching the kernel. This is useful for e.g. servers
//!   and build systems that need to know the digest values ahead of time so they can be
//!   put into a signed manifest, compared against an allowlist, and so on.
//! * On Linux, the [`linux`] module can enable `fs-verity` on a file and fetch the
//!   kernel's own measurement through the `ioctl` interface.
//!
//! The Merkle tree is built streamingly, one block buffer per tree level, and is
//! discarded as it is consumed; only the root hash survives, inside the descriptor. The
//! construction is bit-exact with the kernel's on-disk definition, including the salt
//! padding and the fixed 256-byte descriptor layout, because any deviation would produce
//! an incompatible digest.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use fsverity_digest::{compute_digest, MerkleTreeParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("some/file")?;
//! let params = MerkleTreeParams {
//!     file_size: file.metadata()?.len(),
//!     ..Default::default()
//! };
//! let digest = compute_digest(BufReader::new(file), &params)?;
//! println!("{digest}");
//! # Ok(())
//! # }
//! ```

mod config;

pub use config::*;

mod error;

pub use error::*;

mod hash;

pub use hash::*;

mod tree;

#[cfg(target_os = "linux")]
pub mod linux;

mod digest;

pub use digest::*;
