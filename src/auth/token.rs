//! Token secrets and the credential record persisted between runs.

pub mod record;
pub mod secret;
