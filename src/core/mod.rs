//! Adapter Core
//!
//! Collaborator contracts, replay channels, the reactive state and the
//! redirect callback coordinator.

pub mod adapter;
pub mod callback;
pub mod client;
pub mod navigator;
pub mod state;
pub mod subject;

pub use adapter::*;
pub use callback::*;
pub use client::*;
pub use navigator::*;
pub use state::*;
pub use subject::*;
