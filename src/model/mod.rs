pub mod common;
pub mod environment;
pub mod matrix;
pub mod pact;
pub mod pacticipant;
pub mod selector;
pub mod version;

pub use common::*;
pub use environment::*;
pub use matrix::*;
pub use pact::*;
pub use pacticipant::*;
pub use selector::*;
pub use version::*;
