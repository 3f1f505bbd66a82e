pub mod body;
pub mod framing;
pub mod request;
pub mod response;

pub use body::*;
pub use framing::*;
pub use request::*;
pub use response::*;
