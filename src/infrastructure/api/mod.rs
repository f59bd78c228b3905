mod http;

pub use http::*;

#[cfg(test)]
pub mod fake;
