//! Vendor application credentials, scope sets, and the persisted token record.

pub mod client;
pub mod scope;
pub mod token;

pub use client::*;
pub use scope::*;
pub use token::{record::*, secret::*};
