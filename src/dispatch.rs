//! One gateway invocation: translate, run the handler, flatten, respond.

use lambda_runtime::tracing::{Level, debug, enabled, error, info};
use lambda_runtime::{Diagnostic, LambdaEvent};
use serde_json::Value;
use std::io;

use crate::config::ShimConfig;
use crate::handler::Handler;
use crate::models::{GatewayEvent, GatewayResponse, ShimError};
use crate::request::translate;
use crate::respond::{apply_cors, enforce_body_limit, respond};
use crate::sink::ResponseSink;

/// Handles Lambda events that are not API Gateway HTTP events.
pub type FallbackFn = Box<dyn Fn(Value) -> Result<Value, Diagnostic> + Send + Sync>;

/// Runs `handler` against one gateway event.
///
/// A translation failure never reaches the handler: the event is logged and a
/// `500` carrying the error text is returned instead. The handler's output is
/// flattened, capped at `config.max_body_bytes`, and stamped with the CORS
/// headers.
pub fn serve<H>(event: &GatewayEvent, handler: &H, config: &ShimConfig) -> GatewayResponse
where
    H: Handler + ?Sized,
{
    info!(
        protocol = ?event.protocol(),
        request_id = event.request_id(),
        method = event.method(),
        path = event.path(),
        "Dispatching gateway event"
    );

    let request = match translate(event) {
        Ok(request) => request,
        Err(e) => {
            let err = ShimError::from(e);
            error!(error = %err, event = ?event, "Failed to translate gateway event");
            return respond(None, 500, Some(&err));
        }
    };

    let mut sink = ResponseSink::new();
    handler.handle(&request, &mut sink);

    let mut response = match sink.to_response() {
        Ok(response) => response,
        Err(err) => return respond(None, 500, Some(&err)),
    };
    apply_cors(&mut response.headers);

    let response = enforce_body_limit(response, config.max_body_bytes);
    info!(
        status = response.status_code,
        body_len = response.body.len(),
        "Dispatch complete"
    );
    response
}

/// Lambda-facing entry point wrapping a [`Handler`].
pub struct Dispatcher<H> {
    handler: H,
    config: ShimConfig,
    fallback: Option<FallbackFn>,
}

impl<H: Handler> Dispatcher<H> {
    #[must_use]
    pub const fn new(handler: H, config: ShimConfig) -> Self {
        Self {
            handler,
            config,
            fallback: None,
        }
    }

    /// Routes non-gateway events to `fallback` instead of rejecting them.
    #[must_use]
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Diagnostic> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(fallback));
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ShimConfig {
        &self.config
    }

    #[must_use]
    pub fn serve(&self, event: &GatewayEvent) -> GatewayResponse {
        serve(event, &self.handler, &self.config)
    }

    /// Handles a raw Lambda event.
    ///
    /// Logs the full payload when `RUST_LOG=debug`, only its size otherwise.
    /// A payload shaped like a gateway event always gets a gateway response,
    /// even when one of its fields cannot be parsed.
    ///
    /// # Errors
    ///
    /// Returns a `Diagnostic` with one of the following types:
    ///
    /// - `UnsupportedEvent`: the payload is not a gateway HTTP event and no fallback is set
    /// - `SerializationError`: the gateway response could not be turned into JSON
    ///
    /// Errors from the fallback are passed through unchanged.
    pub fn handle_event(&self, event: LambdaEvent<Value>) -> Result<Value, Diagnostic> {
        let (payload, context) = event.into_parts();
        debug!(payload = ?payload, "Received event");
        if enabled!(Level::INFO) {
            info!(
                aws_request_id = %context.request_id,
                event_size = serialized_len(&payload),
                "Received event"
            );
        }

        if !GatewayEvent::is_gateway_payload(&payload) {
            return match &self.fallback {
                Some(fallback) => fallback(payload),
                None => {
                    let err = ShimError::UnsupportedEvent;
                    error!(error = %err, "No handler for event");
                    Err(diagnostic("UnsupportedEvent", &err))
                }
            };
        }

        let response = match GatewayEvent::from_payload(&payload) {
            Ok(event) => self.serve(&event),
            Err(source) => {
                let err = ShimError::MalformedEvent { source };
                error!(error = %err, event = %payload, "Failed to parse gateway event");
                respond(None, 500, Some(&err))
            }
        };

        serde_json::to_value(response).map_err(|e| {
            let err = ShimError::from(e);
            error!(error = %err, "Failed to serialize gateway response");
            diagnostic("SerializationError", &err)
        })
    }
}

/// Counts serialized bytes without buffering them.
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn serialized_len(payload: &Value) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, payload) {
        Ok(()) => counter.0,
        Err(_) => 0,
    }
}

fn diagnostic(error_type: &str, err: &ShimError) -> Diagnostic {
    Diagnostic {
        error_type: error_type.to_string(),
        error_message: err.to_string(),
    }
}
