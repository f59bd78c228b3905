mod api;
mod channel;
mod error;
mod message;
mod notification;
mod session;
mod slash_commands;

pub use api::*;
pub use channel::*;
pub use error::*;
pub use message::*;
pub use notification::*;
pub use session::*;
pub use slash_commands::*;
