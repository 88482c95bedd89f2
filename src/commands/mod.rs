pub mod eval;
pub mod manifest;
pub mod query;
pub mod reconcile;
pub mod status;
