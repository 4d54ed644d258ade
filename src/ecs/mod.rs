mod client;
pub mod sigv4;
mod types;

pub use client::{Client, RetryPolicy};
pub use sigv4::Credentials;
