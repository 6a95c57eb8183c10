pub mod client;

pub use client::ClobClient;
