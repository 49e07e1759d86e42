//! Data models for the yutai backend.
//!
//! These models keep the JSON field names of the published catalog and of existing
//! backup files so documents interoperate without conversion.

mod backup;
mod catalog;
mod holding;

pub use backup::*;
pub use catalog::*;
pub use holding::*;
