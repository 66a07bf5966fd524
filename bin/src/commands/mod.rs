//! CLI command implementations.

pub(crate) mod aggregate;
pub(crate) mod collect;
pub(crate) mod query;
pub(crate) mod status;
