//! BasaltDB server and client library.
//!
//! Runs a BasaltDB store as a local Unix socket server, allowing multiple
//! clients to share one store over a JSON-line protocol.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::BasaltClient;
pub use server::BasaltServer;
