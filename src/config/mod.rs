//! Configuration Management
//!
//! Client options and API credentials.

pub mod credentials;
pub mod options;

pub use credentials::{Credentials, SecretString};
pub use options::{ClientOptions, ProxyAuth, ProxyConfig};
