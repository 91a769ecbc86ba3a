//! Core domain types
//!
//! This module contains the core domain structures used across Shipyard crates.
//! These types describe what a release targets and what it produced, and are
//! shared between the engine (which executes a run) and the CLI (which reports it).

pub mod build;
pub mod deployment;
pub mod installer;
pub mod resource;
pub mod service;
pub mod stage;
