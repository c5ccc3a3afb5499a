//! Adapters implementing application ports
//!
//! - `circuit_breaker`: fail-fast wrapper for external calls
//! - `routing_matrix_adapter`: `RoutingMatrixPort` over the Matrix API client
//! - `redis_stream_adapter`: `EventStreamPort` over Redis streams

mod circuit_breaker;
mod redis_stream_adapter;
mod routing_matrix_adapter;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitOpenError, CircuitState,
};
pub use redis_stream_adapter::RedisStreamAdapter;
pub use routing_matrix_adapter::RoutingMatrixAdapter;
