pub mod builder;
pub mod data;

pub use builder::*;
pub use data::*;
