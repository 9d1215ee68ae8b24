//! Weft Config
//!
//! This crate contains the serializable workflow graph types for weft.
//! These types represent workflow definitions exactly as the editor and the
//! graph store hand them over, before they are normalized and planned by the
//! engine.
//!
//! Graphs can be loaded from:
//! - JSON files (via the CLI)
//! - Database storage (as JSON blobs)
//!
//! Nodes have been stored in three historical shapes over time, so
//! [`RawNode`] accepts all of them. Nothing in here interprets a node; the
//! single adapter that turns a [`RawNode`] into a canonical node lives in
//! `weft-workflow`.

mod edge;
mod node;
mod workflow;

pub use edge::EdgeDef;
pub use node::{Position, RawNode, RawNodeData};
pub use workflow::WorkflowDef;
