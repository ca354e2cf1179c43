//! Configuration for the Tellus terrain engine.
//!
//! Settings persist to disk as RON files, deserialize missing fields to their
//! defaults for forward compatibility, and derive the per-level distance
//! threshold tables the LOD scratchpad consumes.

mod config;
mod error;

pub use config::{Config, DebugConfig, TerrainConfig};
pub use error::ConfigError;
