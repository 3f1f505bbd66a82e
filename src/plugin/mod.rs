pub mod broker;
pub mod declaration;
pub mod listener;
pub mod loader;

pub use broker::*;
pub use declaration::*;
pub use listener::*;
pub use loader::*;
