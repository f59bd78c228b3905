mod connection;
#[cfg(test)]
pub mod test_server;

pub use connection::*;
