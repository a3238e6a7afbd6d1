use std::panic;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wiki_collab::config::{self, Config};
use wiki_collab::docs::ApiDoc;
use wiki_collab::routes::{cors_layer, create_api_routes, create_socket_routes};
use wiki_collab::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "wiki_collab=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = config::init_config(Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    }));

    if config.persistence_url.is_none() {
        warn!("No persistence URL configured - sync clients built from this config cannot save");
    }

    let app_state = Arc::new(AppState::new());

    // API routes plus Swagger UI
    let api_routes = Router::new()
        .nest("/api", create_api_routes(app_state.clone()))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&config.cors_origin_list()))
        .layer(TraceLayer::new_for_http());

    // Collaboration socket routes
    let socket_routes = create_socket_routes(app_state.clone())
        .layer(TraceLayer::new_for_http());

    let ws_addr = config.ws_address();
    let ws_listener = match tokio::net::TcpListener::bind(&ws_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind WebSocket server to {}: {}", ws_addr, e);
            return;
        }
    };

    info!("📡 WebSocket server starting on ws://{}", ws_addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(ws_listener, socket_routes).await {
            error!("WebSocket server error: {}", e);
        }
    });

    // Start the HTTP/API server
    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down...");
    };

    if let Err(e) = axum::serve(listener, api_routes)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("Server error: {}", e);
    }
}
