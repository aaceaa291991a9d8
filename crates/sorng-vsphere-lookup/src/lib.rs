//! # SortOfRemote NG – vSphere Host-Network Lookups
//!
//! Resolves vSphere host networking objects by name through the VI/JSON
//! API: a host's network system, its standard virtual switches and port
//! groups, and the vCenter `Network` a host participates in.
//!
//! ## Modules
//!
//! - **types** — Managed object references, handles and property shapes
//! - **error** — Crate-specific error types
//! - **vim** — `VimApi`, the seam the lookups run against
//! - **property** — Typed property retrieval
//! - **finder** — Inventory path search over datacenter network folders
//! - **lookup** — Name-based lookups with per-call timeouts
//! - **vsphere** — VI/JSON HTTP client with session-based auth
//! - **service** — Connection façade + shared state alias

pub mod types;
pub mod error;
pub mod vim;
pub mod property;
pub mod finder;
pub mod lookup;
pub mod vsphere;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{VsphereError, VsphereErrorKind, VsphereResult};
pub use lookup::NetworkLookup;
pub use vim::VimApi;
pub use vsphere::VsphereClient;
