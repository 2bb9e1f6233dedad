//! Integration tests for the cadence lifecycle
//!
//! These tests drive whole operations end to end against a scaffolded
//! temporary project: filesystem encoding, registry, task-state store,
//! completion detection, and the git tagging stage.

pub mod collection_flow;
pub mod helpers;
pub mod item_flow;
pub mod tagging;
