//! Repository layer
//!
//! All database operations, one module per entity.

pub mod lkg;
pub mod run;
pub mod stage;

pub use lkg as lkg_repository;
pub use run as run_repository;
pub use stage as stage_repository;
