#![doc = "blogpost-sync-core: core logic library for blogpost-sync."]

//! This crate holds everything that decides *what* to publish: discovery of
//! documentation folders, the publish-state record kept in each folder's
//! sidecar file, README to article conversion and the per-record sync step.
//!
//! Network clients live in the `blogpost-sync` binary crate and plug in through
//! the traits in [`contract`].

pub mod config;
pub mod contract;
pub mod discovery;
pub mod error;
pub mod links;
pub mod payload;
pub mod publish;
pub mod record;
pub mod synchronise;

pub use error::{FormatError, SyncError};
