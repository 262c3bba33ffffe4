//! Sender and receiver session state
//!
//! The sessions expose plain synchronous methods the owning application
//! drives from its own event loop; nothing here depends on a UI toolkit.

mod receiver;
mod sender;

pub use receiver::*;
pub use sender::*;
