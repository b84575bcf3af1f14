//! Access credentials, refresh records, and the redacted secret wrapper they share.

pub mod access;
pub mod pair;
pub mod refresh;
pub mod secret;
