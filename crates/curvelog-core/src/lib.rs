//! Core engine for multi-curve indexed logs.
//!
//! A log is a header (identity, index axis, direction, ordered curve
//! definitions) plus bulk rows keyed by index value. This crate provides:
//!
//! - Direction-aware index algebra over time and depth axes (`index`).
//! - A header model that tells omitted fields apart from empty ones
//!   (`metadata`) and the rules for reconciling inbound headers with stored
//!   ones (`reconcile`).
//! - Extraction of inbound comma-separated data into typed rows (`extract`).
//! - A per-log, append-only commit log with optimistic concurrency
//!   (`transaction_log`), exposed through the `repository` collaborator
//!   traits.
//! - The mutation orchestrator and partial delete engine (`store`), change
//!   notifications (`notify`), and read-only channel projection
//!   (`projection`).
//!
//! Front ends (for example the `curvelog` CLI) depend on this crate rather
//! than re-implementing header or range logic.
#![deny(missing_docs)]
pub mod bulk;
pub mod extract;
pub mod index;
pub mod metadata;
pub mod notify;
pub mod projection;
pub mod reconcile;
pub mod repository;
pub mod storage;
pub mod store;
pub mod transaction_log;

pub use index::{Direction, IndexMode, IndexRange, IndexValue};
pub use metadata::{Curve, LogHeader, LogUri};
pub use store::{LogStore, StoreError, StoreOptions};
