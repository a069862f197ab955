//! Bitbucket REST API 1.0 client for bbkit.
//!
//! Start from a [`BitBucket`] client, derive [`User`], [`Repository`], or
//! [`Issue`] handles from it, and call their accessors. Every accessor
//! issues one blocking GET and returns the parsed JSON unchanged.
//!
//! ```ignore
//! use bbkit_bitbucket::BitBucket;
//!
//! let bb = BitBucket::anonymous()?;
//! let tags = bb.repository("alice", "proj").tags()?;
//! ```

mod client;
mod handles;
mod query;
mod transport;

pub use client::{BitBucket, EMPTY_LIST};
pub use handles::{Issue, Repository, User};
pub use query::smart_encode;
pub use transport::{HttpMethod, HttpTransport, Request, Transport};
