use log::info;
use std::env;

mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod state;

#[cfg(test)]
mod tests;

use config::SiteConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Logging initialized with env_logger");
    info!("Starting Site Service");

    let config = SiteConfig::from_env()?;
    let app = routes::create_router(&config).await?;

    if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("Running under the Lambda runtime");
        lambda_http::run(app)
            .await
            .map_err(|e| anyhow::anyhow!("Lambda runtime error: {}", e))?;
    } else {
        let addr = format!("0.0.0.0:{}", config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Listening on {}", addr);
        axum::serve(listener, app).await?;
    }

    Ok(())
}
