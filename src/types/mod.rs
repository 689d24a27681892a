//! Adapter Types
//!
//! Configuration, option and profile types shared by the adapter.

pub mod callback;
pub mod config;
pub mod options;
pub mod profile;

pub use callback::*;
pub use config::*;
pub use options::*;
pub use profile::*;
