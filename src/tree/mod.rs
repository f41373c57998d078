pub mod format;
pub mod model;
pub mod node;
pub mod visit;

pub use model::*;
pub use node::*;
