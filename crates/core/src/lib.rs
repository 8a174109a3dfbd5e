//! Core logic for the recycle-bin service.
//!
//! Implements archive-then-delete soft deletion, registry-driven restore,
//! and retention sweeping on top of an abstract [`store::RowStore`]. This
//! crate is persistence-agnostic: the Postgres binding lives in `rbin-db`
//! and the HTTP surface in `rbin-api`.

pub mod archive;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod restore;
pub mod store;
pub mod sweeper;
pub mod types;
