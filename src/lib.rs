pub mod config;
pub mod error;
pub mod headers;
pub mod hls;
pub mod metrics;
pub mod server;
pub mod upstream;
