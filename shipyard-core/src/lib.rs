//! Shipyard Core
//!
//! Core types and abstractions for the Shipyard release pipeline.
//!
//! This crate contains:
//! - Domain types: Core business entities (DeploymentSpec, ServiceStatus, StageOutcome, etc.)
//! - DTOs: Data transfer objects for talking to the container control plane

pub mod domain;
pub mod dto;
