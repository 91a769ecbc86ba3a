//! Shipyard pipeline engine
//!
//! Builds a container image, publishes it, converges the service on the
//! container control plane and packages a desktop installer. Stages run in
//! a fixed order and share one immutable set of specs per run; external
//! systems sit behind the collaborator traits in [`backend`].

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod installer_script;
pub mod local_env;
pub mod pipeline;
pub mod process;
pub mod reconciler;
pub mod stage;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use context::{Backends, PipelineContext, RunSettings};
pub use error::{PipelineError, Result};
pub use pipeline::PipelineOrchestrator;
