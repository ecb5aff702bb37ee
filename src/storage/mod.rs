//! Local Storage Module
//!
//! The single-node key-value map every cluster operation eventually lands in.
//! It knows nothing about peers, quorum or leadership; `NodeCoordinator` layers
//! all of that on top.

pub mod memory;
