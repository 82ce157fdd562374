use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use comfyui_image_relay::{api, config, pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    config::Config::dotenv_load();
    let config = config::Config::new()?;
    config::Config::log_env_vars();
    if !config.comfyui_input_dir.is_dir() {
        tracing::warn!(
            "ComfyUI input directory {} does not exist; uploads will fail until it does",
            config.comfyui_input_dir.display()
        );
    }

    let ip: std::net::IpAddr = config.api_host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 0.0.0.0", config.api_host);
        std::net::IpAddr::from([0, 0, 0, 0])
    });
    let port: u16 = config.api_port.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_PORT '{}', falling back to 2310", config.api_port);
        2310
    });

    let state = Arc::new(api::routes::AppState {
        relay: pipeline::ImageRelay::new(config),
    });
    let app = api::routes::router(state);

    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
