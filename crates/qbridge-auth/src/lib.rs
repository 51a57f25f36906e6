//! ACL cache and token verification (design §4.2).
//!
//! The bridge never decodes bearer tokens itself — that is the named
//! configuration manager's job, exposed here as the [`TokenVerifier`]
//! trait so this crate stays independent of however tokens are actually
//! issued. What this crate owns is the *memoized* result: a
//! [`ServerAcl`] per token, a bounded LRU cache of those, and the
//! host/IP allowlist check itself.

mod acl;
mod cache;
mod cidr;
mod claims;

pub use acl::ServerAcl;
pub use cache::AclCache;
pub use claims::{Claims, TokenVerifier};
