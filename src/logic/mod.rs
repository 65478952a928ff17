pub mod decorator;
pub mod group_summary;
pub mod interaction_graph;
pub mod matrix;
pub mod reasons;
pub mod verification_lookup;
pub mod version_resolver;

pub use decorator::*;
pub use group_summary::*;
pub use interaction_graph::*;
pub use matrix::*;
pub use verification_lookup::*;
pub use version_resolver::*;
