// Library exports for xchange-client

pub mod config; // Credentials and client options
pub mod error;

// Xchange API integration modules
pub mod xchange; // REST client, request builder and wire types
pub mod market; // Response normalization and chart formatting

pub mod depth; // Order book depth cache and aggregation

pub use config::{ClientOptions, Credentials};
pub use depth::{DepthCache, DepthEvent, DepthSnapshot, Side, ValueMode};
pub use error::{Result, XchangeError};
pub use xchange::XchangeClient;
