//! State module for tracking per-item progress
//!
//! # Components
//!
//! - `Item`: one query read from the input file
//! - `ItemResult`: the recorded outcome of processing one item
//! - `ItemState`: the per-item state machine driven by the run orchestrator

mod item;
mod item_state;

// Re-export main types
pub use item::{Item, ItemResult, ResultData};
pub use item_state::ItemState;
