//! Xchange API Client
//!
//! Request construction, the HTTP transport and the wire types of the
//! Xchange REST API.

pub mod client;
pub mod request;
pub mod types;

// Re-export commonly used types
pub use client::{
    XchangeClient, DEFAULT_DEPTH_LIMIT, DEFAULT_KLINE_LIMIT, DEFAULT_WITHDRAW_NAME,
};
pub use request::{sign_payload, AuthTier, Method, Params, RequestBuilder, RequestDescriptor};
pub use types::{
    AccountInfo, Balance, BookTicker, DepthResponse, Kline, OpenOrder, OrderFlags, OrderResponse,
    OrderSide, OrderType, PriceResponse, ServerTimeResponse, TickerPrice,
};
