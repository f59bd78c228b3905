pub mod api;
pub mod channel;
pub mod storage;
