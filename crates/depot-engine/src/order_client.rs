//! # Order Service Client
//!
//! The two order-service calls inventory depends on: placing a
//! replenishment order and looking up an order's status.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Order Service Boundary                           │
//! │                                                                         │
//! │  Replenisher ─────────┐                                                 │
//! │                       ├──► dyn OrderService ──► GrpcOrderClient        │
//! │  OrderTimeoutHandler ─┘          │                    │                 │
//! │                                  │ (tests: in-memory  │ tonic Channel   │
//! │                                  │  doubles)          │ (lazy connect)  │
//! │                                  ▼                    ▼                 │
//! │                                              order.v1.OrderService      │
//! │                                              /CreateOrder               │
//! │                                              /GetOrderByID              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call carries the caller's timeout. Expiry, transport failures and
//! non-OK statuses all become [`EngineError::RemoteCallFailed`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;
use tracing::{debug, info};

use depot_core::OrderLine;

use crate::config::OrderServiceSettings;
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Domain Types
// =============================================================================

/// Lifecycle state reported by the order service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Placed, not paid. The only state whose locked stock may be released.
    Pending,
    Paid,
    Shipped,
    Completed,
    Cancelled,
    /// A status code this build does not know.
    Unknown(i32),
}

impl OrderStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => OrderStatus::Pending,
            1 => OrderStatus::Paid,
            2 => OrderStatus::Shipped,
            3 => OrderStatus::Completed,
            4 => OrderStatus::Cancelled,
            other => OrderStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Completed => 3,
            OrderStatus::Cancelled => 4,
            OrderStatus::Unknown(code) => *code,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

/// An order as far as inventory cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub order_id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
}

/// A request to place an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    pub lines: Vec<OrderLine>,
    pub remark: String,
}

impl CreateOrderRequest {
    /// A single-line replenishment order.
    pub fn replenishment(user_id: i64, sku_id: i64, quantity: i64) -> Self {
        CreateOrderRequest {
            user_id,
            lines: vec![OrderLine::new(sku_id, quantity)],
            remark: format!("auto replenishment for SKU {sku_id}"),
        }
    }
}

// =============================================================================
// Service Trait
// =============================================================================

/// The order service as seen from inventory.
#[async_trait]
pub trait OrderService: Send + Sync + fmt::Debug {
    /// Places an order and returns its id.
    async fn create_order(&self, request: CreateOrderRequest, timeout: Duration) -> EngineResult<i64>;

    /// Looks up an order.
    ///
    /// ## Returns
    /// * `Ok(Some(order))` - Found
    /// * `Ok(None)` - The service has no such order
    /// * `Err(EngineError::RemoteCallFailed)` - Lookup failed or timed out
    async fn get_order_by_id(
        &self,
        order_id: i64,
        user_id: i64,
        timeout: Duration,
    ) -> EngineResult<Option<OrderSnapshot>>;
}

// =============================================================================
// Wire Messages
// =============================================================================

/// Messages of `order.v1.OrderService`, declared by hand.
pub mod wire {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct OrderItem {
        #[prost(int64, tag = "1")]
        pub sku_id: i64,
        #[prost(int64, tag = "2")]
        pub quantity: i64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateOrderRequest {
        #[prost(int64, tag = "1")]
        pub user_id: i64,
        #[prost(message, repeated, tag = "2")]
        pub items: Vec<OrderItem>,
        #[prost(string, tag = "3")]
        pub remark: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CreateOrderResponse {
        #[prost(int64, tag = "1")]
        pub order_id: i64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetOrderByIdRequest {
        #[prost(int64, tag = "1")]
        pub order_id: i64,
        #[prost(int64, tag = "2")]
        pub user_id: i64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Order {
        #[prost(int64, tag = "1")]
        pub order_id: i64,
        #[prost(int64, tag = "2")]
        pub user_id: i64,
        #[prost(int32, tag = "3")]
        pub status: i32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct GetOrderByIdResponse {
        #[prost(message, optional, tag = "1")]
        pub order: Option<Order>,
    }
}

const CREATE_ORDER_PATH: &str = "/order.v1.OrderService/CreateOrder";
const GET_ORDER_PATH: &str = "/order.v1.OrderService/GetOrderByID";

impl From<CreateOrderRequest> for wire::CreateOrderRequest {
    fn from(request: CreateOrderRequest) -> Self {
        wire::CreateOrderRequest {
            user_id: request.user_id,
            items: request
                .lines
                .into_iter()
                .map(|line| wire::OrderItem {
                    sku_id: line.sku_id,
                    quantity: line.quantity,
                })
                .collect(),
            remark: request.remark,
        }
    }
}

impl From<wire::Order> for OrderSnapshot {
    fn from(order: wire::Order) -> Self {
        OrderSnapshot {
            order_id: order.order_id,
            user_id: order.user_id,
            status: OrderStatus::from_code(order.status),
        }
    }
}

// =============================================================================
// gRPC Client
// =============================================================================

/// [`OrderService`] over a tonic channel.
///
/// The channel connects on first use, so constructing the client never
/// blocks on the network. It must be built inside a Tokio runtime.
#[derive(Debug, Clone)]
pub struct GrpcOrderClient {
    channel: Channel,
    url: String,
}

impl GrpcOrderClient {
    pub fn connect_lazy(settings: &OrderServiceSettings) -> EngineResult<Self> {
        let endpoint = Endpoint::from_shared(settings.url.clone())
            .map_err(|e| EngineError::Config(format!("Invalid order service endpoint: {}", e)))?
            .connect_timeout(settings.connect_timeout());

        info!(url = %settings.url, "Order service client configured");

        Ok(GrpcOrderClient {
            channel: endpoint.connect_lazy(),
            url: settings.url.clone(),
        })
    }

    async fn unary<Req, Resp>(&self, path: &'static str, message: Req) -> Result<Resp, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("Order service not ready: {}", e)))?;

        let codec = tonic::codec::ProstCodec::default();
        let response = grpc
            .unary(tonic::Request::new(message), PathAndQuery::from_static(path), codec)
            .await?;
        Ok(response.into_inner())
    }

    /// Runs `call` under `timeout`, folding expiry into `RemoteCallFailed`.
    async fn bounded<T, F>(&self, method: &str, timeout: Duration, call: F) -> EngineResult<T>
    where
        F: std::future::Future<Output = Result<T, tonic::Status>>,
    {
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::RemoteCallFailed(format!(
                "{} to {} timed out after {} ms",
                method,
                self.url,
                timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl OrderService for GrpcOrderClient {
    async fn create_order(&self, request: CreateOrderRequest, timeout: Duration) -> EngineResult<i64> {
        debug!(user_id = request.user_id, lines = request.lines.len(), "CreateOrder");

        let message = wire::CreateOrderRequest::from(request);
        let response: wire::CreateOrderResponse = self
            .bounded("CreateOrder", timeout, self.unary(CREATE_ORDER_PATH, message))
            .await?;

        Ok(response.order_id)
    }

    async fn get_order_by_id(
        &self,
        order_id: i64,
        user_id: i64,
        timeout: Duration,
    ) -> EngineResult<Option<OrderSnapshot>> {
        debug!(order_id, user_id, "GetOrderByID");

        let message = wire::GetOrderByIdRequest { order_id, user_id };
        let result: EngineResult<wire::GetOrderByIdResponse> = match tokio::time::timeout(
            timeout,
            self.unary(GET_ORDER_PATH, message),
        )
        .await
        {
            Ok(Err(status)) if status.code() == Code::NotFound => return Ok(None),
            Ok(other) => other.map_err(EngineError::from),
            Err(_) => Err(EngineError::RemoteCallFailed(format!(
                "GetOrderByID to {} timed out after {} ms",
                self.url,
                timeout.as_millis()
            ))),
        };

        Ok(result?.order.map(OrderSnapshot::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_status_codes() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_code(status.code()), status);
        }
        assert_eq!(OrderStatus::from_code(42), OrderStatus::Unknown(42));
        assert!(OrderStatus::Pending.is_pending());
        assert!(!OrderStatus::Paid.is_pending());
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_replenishment_request_on_the_wire() {
        let request = CreateOrderRequest::replenishment(9, 42, 6);
        let message = wire::CreateOrderRequest::from(request);
        assert_eq!(message.user_id, 9);
        assert_eq!(message.items.len(), 1);
        assert_eq!(message.items[0].sku_id, 42);
        assert_eq!(message.items[0].quantity, 6);

        let bytes = message.encode_to_vec();
        let decoded = wire::CreateOrderRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_config_error() {
        let settings = OrderServiceSettings {
            url: "not a url".to_string(),
            ..Default::default()
        };
        let err = GrpcOrderClient::connect_lazy(&settings).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_remote_failure() {
        let settings = OrderServiceSettings {
            url: "http://127.0.0.1:1".to_string(),
            connect_timeout_ms: 200,
            request_timeout_ms: 500,
        };
        let client = GrpcOrderClient::connect_lazy(&settings).unwrap();

        let err = client
            .get_order_by_id(1, 1, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RemoteCallFailed(_)));
        assert!(err.is_retryable());

        let err = client
            .create_order(CreateOrderRequest::replenishment(0, 1, 10), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RemoteCallFailed(_)));
    }
}
