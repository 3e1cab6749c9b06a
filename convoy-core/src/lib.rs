//! Convoy Core
//!
//! Core types and abstractions for the Convoy deployment pipeline engine.
//!
//! This crate contains:
//! - Domain types: Core business entities (PipelineRun, StageExecution, etc.)
//! - DTOs: Data transfer objects for inter-service communication

pub mod domain;
pub mod dto;
