mod chat_client;
mod message_store;
mod notifier;
mod relay;
mod session_store;
mod ui_store;

pub use chat_client::*;
pub use message_store::*;
pub use notifier::*;
pub use relay::*;
pub use session_store::*;
pub use ui_store::*;
