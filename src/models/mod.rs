pub mod error;
pub mod event;
pub mod response;

pub use error::*;
pub use event::*;
pub use response::*;
