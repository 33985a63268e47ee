use apigw_shim::echo::echo;
use apigw_shim::{Dispatcher, ShimConfig};
use lambda_runtime::tracing::info;
use lambda_runtime::{Error, service_fn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Use Lambda runtime's built-in tracing subscriber for CloudWatch Logs
    lambda_runtime::tracing::init_default_subscriber();

    let config = ShimConfig::from_env();
    info!(
        environment = %config.environment,
        max_body_bytes = config.max_body_bytes,
        "Starting gateway shim"
    );

    let dispatcher = Arc::new(Dispatcher::new(echo, config));
    lambda_runtime::run(service_fn(move |event| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.handle_event(event) }
    }))
    .await
}
