//! Runs standard request/response handler code behind API Gateway.
//!
//! A gateway event (payload format 1.0 or 2.0) is translated into a
//! [`request::StandardRequest`], the handler writes its response into a
//! [`sink::ResponseSink`], and the sink is flattened back into the single
//! string-per-header [`models::GatewayResponse`] the gateway expects.

pub mod codec;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod echo;
pub mod handler;
pub mod models;
pub mod request;
pub mod respond;
pub mod sink;
pub mod utils;

pub use config::ShimConfig;
pub use dispatch::{Dispatcher, serve};
pub use handler::Handler;
pub use models::{GatewayEvent, GatewayResponse, ResponseBody};
pub use request::StandardRequest;
pub use sink::{CapturedHeaders, ResponseSink, ResponseWriter};
