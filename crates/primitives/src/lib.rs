#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Primitive types, utilities and constants for the batchd driver.

/// Ethereum chain reference types shared between L1 and L2.
pub mod eth;

/// EIP-4844 blob encoding utilities.
pub mod blob;

/// Utility for summarizing objects into a string for logging purposes.
pub mod summary;

/// Utilities for triggering shutdown signals from active tasks.
pub mod shutdown;

/// A constant for the number of bytes in a kilobyte.
pub const BYTES_PER_KB: usize = 1024;
