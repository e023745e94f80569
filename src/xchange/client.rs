//! Xchange HTTP Client
//!
//! Executes [`RequestDescriptor`]s with reqwest and exposes one async method
//! per REST endpoint. Payloads that the library reshapes (prices, book
//! tickers, balances, depth) come back normalized; the rest are passed
//! through as JSON.

use crate::config::ClientOptions;
use crate::depth::DepthSnapshot;
use crate::error::XchangeError;
use crate::market::normalize::{
    depth_snapshot, normalize_balances, normalize_book_tickers, normalize_prices, BalanceEntry,
    BookQuote,
};
use crate::xchange::request::{Method, Params, RequestBuilder, RequestDescriptor};
use crate::xchange::types::{
    AccountInfo, BookTicker, DepthResponse, Kline, OpenOrder, OrderFlags, OrderResponse,
    OrderSide, PriceResponse, ServerTimeResponse,
};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Exchange message for orders below the minimum notional value
const MIN_NOTIONAL_FAILURE: &str = "Filter failure: MIN_NOTIONAL";

/// Address book label conventionally used for API withdrawals
pub const DEFAULT_WITHDRAW_NAME: &str = "API Withdraw";

/// Default number of candles requested
pub const DEFAULT_KLINE_LIMIT: u32 = 500;

/// Default depth of `v1/depth`
pub const DEFAULT_DEPTH_LIMIT: u32 = 100;

/// Xchange REST API client
///
/// Cheap to clone; clones share the HTTP connection pool and the server
/// time offset.
#[derive(Clone)]
pub struct XchangeClient {
    client: Client,
    requests: RequestBuilder,
    recv_window_ms: u64,
    /// Server time minus local time, added to signed request timestamps
    time_offset_ms: Arc<AtomicI64>,
}

impl std::fmt::Debug for XchangeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XchangeClient")
            .field("requests", &self.requests)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("time_offset_ms", &self.time_offset_ms())
            .finish()
    }
}

impl XchangeClient {
    /// Client with default options and no credentials (public endpoints only)
    pub fn new() -> Result<Self, XchangeError> {
        Self::from_options(ClientOptions::default())
    }

    /// Builds a client without touching the network
    ///
    /// The HTTP timeout equals the receive window.
    pub fn from_options(options: ClientOptions) -> Result<Self, XchangeError> {
        let mut builder = Client::builder().timeout(Duration::from_millis(options.recv_window_ms));

        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| XchangeError::Config(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| XchangeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            requests: RequestBuilder::new(&options.base_url, options.credentials)?,
            recv_window_ms: options.recv_window_ms,
            time_offset_ms: Arc::new(AtomicI64::new(0)),
        })
    }

    /// Builds a client and, when `use_server_time` is set, synchronizes the
    /// signing clock before returning
    pub async fn connect(options: ClientOptions) -> Result<Self, XchangeError> {
        let use_server_time = options.use_server_time;
        let client = Self::from_options(options)?;
        if use_server_time {
            client.use_server_time().await?;
        }
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        self.requests.base_url()
    }

    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    pub fn time_offset_ms(&self) -> i64 {
        self.time_offset_ms.load(Ordering::Relaxed)
    }

    /// Local time corrected by the server offset
    fn timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() + self.time_offset_ms()
    }

    /// Sends a request and decodes the JSON body
    ///
    /// Non-2xx responses become [`XchangeError::Api`] (or a rate limit /
    /// connection error) carrying the response body.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, XchangeError> {
        debug!(
            method = request.method.as_str(),
            path = %request.path(),
            tier = ?request.tier,
            "Sending request"
        );

        let mut http = self
            .client
            .request(request.method.into(), request.url.clone());
        for (name, value) in &request.headers {
            http = http.header(*name, value);
        }

        let response = http.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                path = %request.path(),
                status = status.as_u16(),
                "Request rejected"
            );
            return Err(XchangeError::from_status(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Generic public call for endpoints without a dedicated method
    pub async fn public_request(
        &self,
        method: Method,
        endpoint: &str,
        params: Params,
    ) -> Result<serde_json::Value, XchangeError> {
        self.execute(self.requests.public(method, endpoint, params)?)
            .await
    }

    /// Generic signed call for endpoints without a dedicated method
    pub async fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        params: Params,
    ) -> Result<serde_json::Value, XchangeError> {
        self.signed(method, endpoint, params).await
    }

    async fn public<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Params,
    ) -> Result<T, XchangeError> {
        self.execute(self.requests.public(Method::Get, endpoint, params)?)
            .await
    }

    async fn api_keyed<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Params,
    ) -> Result<T, XchangeError> {
        self.execute(self.requests.api_keyed(Method::Get, endpoint, params)?)
            .await
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Params,
    ) -> Result<T, XchangeError> {
        let request = self.requests.signed(
            method,
            endpoint,
            params,
            self.timestamp(),
            self.recv_window_ms,
        )?;
        self.execute(request).await
    }

    // ---- general ----

    /// Fetches the server time (`v1/time`)
    pub async fn time(&self) -> Result<i64, XchangeError> {
        let response: ServerTimeResponse = self.api_keyed("v1/time", Params::new()).await?;

        if !response.is_valid() {
            return Err(XchangeError::ParseError(format!(
                "Invalid server time received: {}",
                response.server_time
            )));
        }

        Ok(response.time_ms())
    }

    /// Stores the server/local clock offset used for signed timestamps
    ///
    /// Returns the new offset in milliseconds.
    pub async fn use_server_time(&self) -> Result<i64, XchangeError> {
        let server_time = self.time().await?;
        let offset = server_time - chrono::Utc::now().timestamp_millis();
        self.time_offset_ms.store(offset, Ordering::Relaxed);

        info!(server_time, offset_ms = offset, "Synchronized with server time");
        Ok(offset)
    }

    /// Exchange rules and market list (`v1/exchangeInfo`)
    pub async fn exchange_info(&self) -> Result<serde_json::Value, XchangeError> {
        self.public("v1/exchangeInfo", Params::new()).await
    }

    // ---- market data ----

    /// Latest prices keyed by market; all markets when `market` is `None`
    pub async fn prices(&self, market: Option<&str>) -> Result<BTreeMap<String, Decimal>, XchangeError> {
        let response: PriceResponse = self
            .public("v1/ticker/price", Params::new().with_opt("market", market))
            .await?;
        Ok(normalize_prices(response))
    }

    /// Best bid/ask of every market, keyed by market
    pub async fn book_tickers(&self) -> Result<BTreeMap<String, BookQuote>, XchangeError> {
        let tickers: Vec<BookTicker> = self.public("v1/ticker/bookTicker", Params::new()).await?;
        Ok(normalize_book_tickers(&tickers))
    }

    /// Best bid/ask of one market, as returned by the exchange
    pub async fn book_ticker(&self, market: &str) -> Result<BookTicker, XchangeError> {
        self.public("v1/ticker/bookTicker", Params::new().with("market", market))
            .await
    }

    /// 24 hour statistics, for one market or all
    pub async fn prev_day(&self, market: Option<&str>) -> Result<serde_json::Value, XchangeError> {
        self.public("v1/ticker/24hr", Params::new().with_opt("market", market))
            .await
    }

    /// Order book snapshot (`v1/depth`)
    pub async fn depth(&self, market: &str, limit: u32) -> Result<DepthSnapshot, XchangeError> {
        let response: DepthResponse = self
            .public(
                "v1/depth",
                Params::new().with("market", market).with("limit", limit),
            )
            .await?;
        Ok(depth_snapshot(response)?)
    }

    /// Candlesticks (`v1/klines`)
    ///
    /// Intervals: 1m, 3m, 5m, 15m, 30m, 1h, 2h, 4h, 6h, 8h, 12h, 1d, 3d, 1w, 1M
    pub async fn candlesticks(
        &self,
        market: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Kline>, XchangeError> {
        self.public(
            "v1/klines",
            Params::new()
                .with("market", market)
                .with("interval", interval)
                .with("limit", limit),
        )
        .await
    }

    /// Recent public trades (`v1/trades`, API key required)
    pub async fn recent_trades(
        &self,
        market: &str,
        limit: u32,
    ) -> Result<serde_json::Value, XchangeError> {
        self.api_keyed(
            "v1/trades",
            Params::new().with("market", market).with("limit", limit),
        )
        .await
    }

    // ---- account ----

    pub async fn account(&self) -> Result<AccountInfo, XchangeError> {
        self.signed(Method::Get, "v1/account", Params::new()).await
    }

    /// Balances keyed by asset
    pub async fn balance(&self) -> Result<BTreeMap<String, BalanceEntry>, XchangeError> {
        let account = self.account().await?;
        Ok(normalize_balances(&account))
    }

    /// Own trade history for a market (`v1/myTrades`)
    pub async fn trades(&self, market: &str) -> Result<serde_json::Value, XchangeError> {
        self.signed(
            Method::Get,
            "v1/myTrades",
            Params::new().with("market", market),
        )
        .await
    }

    // ---- orders ----

    /// Places an order
    ///
    /// `price` is only sent for limit-style order types.
    pub async fn order(
        &self,
        side: OrderSide,
        market: &str,
        quantity: Decimal,
        price: Decimal,
        flags: OrderFlags,
    ) -> Result<OrderResponse, XchangeError> {
        let mut params = Params::new()
            .with("market", market)
            .with("side", side)
            .with("type", flags.order_type.as_str())
            .with("quantity", quantity);
        if flags.order_type.requires_price() {
            params.push("price", price);
        }
        for (key, value) in &flags.extra {
            params.push(key, value);
        }

        let response: OrderResponse = self.signed(Method::Post, "v1/order", params).await?;

        if response.get("msg").and_then(|m| m.as_str()) == Some(MIN_NOTIONAL_FAILURE) {
            warn!(
                market = %market,
                %quantity,
                "Order quantity too small. See exchange_info() for minimum amounts"
            );
        }

        debug!(side = %side, market = %market, %quantity, %price, "Order submitted");
        Ok(response)
    }

    /// Limit buy
    pub async fn buy(
        &self,
        market: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderResponse, XchangeError> {
        self.order(OrderSide::Buy, market, quantity, price, OrderFlags::default())
            .await
    }

    /// Limit sell
    pub async fn sell(
        &self,
        market: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<OrderResponse, XchangeError> {
        self.order(OrderSide::Sell, market, quantity, price, OrderFlags::default())
            .await
    }

    pub async fn market_buy(
        &self,
        market: &str,
        quantity: Decimal,
    ) -> Result<OrderResponse, XchangeError> {
        self.order(OrderSide::Buy, market, quantity, Decimal::ZERO, OrderFlags::market())
            .await
    }

    pub async fn market_sell(
        &self,
        market: &str,
        quantity: Decimal,
    ) -> Result<OrderResponse, XchangeError> {
        self.order(OrderSide::Sell, market, quantity, Decimal::ZERO, OrderFlags::market())
            .await
    }

    pub async fn cancel(&self, market: &str, order_id: u64) -> Result<OrderResponse, XchangeError> {
        self.signed(
            Method::Delete,
            "v1/order",
            Params::new().with("market", market).with("orderId", order_id),
        )
        .await
    }

    pub async fn order_status(
        &self,
        market: &str,
        order_id: u64,
    ) -> Result<OrderResponse, XchangeError> {
        self.signed(
            Method::Get,
            "v1/order",
            Params::new().with("market", market).with("orderId", order_id),
        )
        .await
    }

    /// Open orders for one market, or all markets
    pub async fn open_orders(&self, market: Option<&str>) -> Result<Vec<OpenOrder>, XchangeError> {
        self.signed(
            Method::Get,
            "v1/openOrders",
            Params::new().with_opt("market", market),
        )
        .await
    }

    /// Cancels every open order of a market, one request per order
    ///
    /// Returns the cancel responses in listing order; empty when nothing was
    /// open. Stops at the first failed cancel.
    pub async fn cancel_orders(&self, market: &str) -> Result<Vec<OrderResponse>, XchangeError> {
        let open = self.open_orders(Some(market)).await?;
        if open.is_empty() {
            info!(market = %market, "No open orders to cancel");
            return Ok(Vec::new());
        }

        let mut responses = Vec::with_capacity(open.len());
        for order in &open {
            info!(
                market = %market,
                side = %order.side,
                remaining = %order.remaining_qty(),
                price = %order.price,
                order_id = order.order_id,
                "Cancelling order"
            );
            responses.push(self.cancel(market, order.order_id).await?);
        }
        Ok(responses)
    }

    /// Every order of a market (`v1/allOrders`)
    pub async fn all_orders(&self, market: &str) -> Result<serde_json::Value, XchangeError> {
        self.signed(
            Method::Get,
            "v1/allOrders",
            Params::new().with("market", market),
        )
        .await
    }

    // ---- wallet ----

    /// Withdraws `amount` of `asset` to `address`
    ///
    /// `name` labels the address in the exchange address book; `None` keeps
    /// it out of the book. Pass [`DEFAULT_WITHDRAW_NAME`] to save it under
    /// the usual label. The signature covers every parameter, `name`
    /// included, so the exchange must verify it over the full query.
    pub async fn withdraw(
        &self,
        asset: &str,
        address: &str,
        amount: Decimal,
        address_tag: Option<&str>,
        name: Option<&str>,
    ) -> Result<serde_json::Value, XchangeError> {
        let params = Params::new()
            .with("symbol", asset)
            .with("address", address)
            .with("amount", amount)
            .with_opt("addressTag", address_tag)
            .with_opt("name", name);

        self.signed(Method::Post, "v1/withdraw", params).await
    }

    pub async fn withdraw_history(
        &self,
        asset: Option<&str>,
    ) -> Result<serde_json::Value, XchangeError> {
        self.signed(
            Method::Get,
            "v1/withdrawHistory",
            Params::new().with_opt("asset", asset),
        )
        .await
    }

    pub async fn deposit_history(
        &self,
        asset: Option<&str>,
    ) -> Result<serde_json::Value, XchangeError> {
        self.signed(
            Method::Get,
            "v1/depositHistory",
            Params::new().with_opt("symbol", asset),
        )
        .await
    }

    pub async fn deposit_address(&self, asset: &str) -> Result<serde_json::Value, XchangeError> {
        self.signed(
            Method::Get,
            "v1/deposit",
            Params::new().with("symbol", asset),
        )
        .await
    }
}
