mod connect;
mod error;
mod link;
pub mod protocol;

pub use connect::{ConnectConfig, establish, handshake};
pub use error::{CommsErr, Result};
pub use link::ExplorerLink;
