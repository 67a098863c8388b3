//! Loading and screening input networks

pub mod formats;
pub mod parquet;
pub mod preprocessing;

pub use formats::{iter_graph_files, load_graph};
pub use preprocessing::Thresholds;
