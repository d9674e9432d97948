// crates/network/src/lib.rs
//! HTTP plumbing shared by metadata sources and language model clients

mod client;
mod error;

pub use client::{Client, ClientConfig};
pub use error::{NetworkError, NetworkResult};
