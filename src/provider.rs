//! Vendor endpoint descriptors.
//!
//! `descriptor` exposes validated, HTTPS-only metadata ([`ProviderDescriptor`]) covering the
//! authorization page, the token endpoint, and the resource API base.

pub mod descriptor;

pub use descriptor::*;
