//! # Domain Layer
//!
//! Value objects shared by the node's use cases. Nothing here performs I/O.

pub mod value_objects;
