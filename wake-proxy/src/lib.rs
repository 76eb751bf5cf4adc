pub mod config;
pub mod error;
pub mod reachability;
pub mod tcp;
pub mod udp;
pub mod wake;

pub use config::{Config, Protocol};
pub use error::ProxyError;
