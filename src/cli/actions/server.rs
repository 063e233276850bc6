use crate::{
    api::{
        self,
        handlers::deletion::{DeletionProxy, ProxyConfig},
    },
    cli::telemetry,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: String,
    pub delete_data_url: String,
    pub delete_account_url: String,
    pub upstream_timeout_seconds: u64,
}

impl Args {
    #[must_use]
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig::new()
            .with_delete_data_url(self.delete_data_url.clone())
            .with_delete_account_url(self.delete_account_url.clone())
            .with_upstream_timeout_seconds(self.upstream_timeout_seconds)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the upstream URLs are invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let proxy = Arc::new(DeletionProxy::new(args.proxy_config())?);

    let result = api::new(args.port, proxy, &args.frontend_base_url).await;

    telemetry::shutdown_tracer();

    result
}
