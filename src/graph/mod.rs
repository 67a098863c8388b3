//! Graph representation and algorithms module

pub mod algorithms;
pub mod builder;
pub mod compressed;
pub mod generators;

pub use builder::{BuildReport, GraphBuilder};
pub use compressed::Graph;
