//! Dual-mode entrypoint: Lambda or local dev server.
//!
//! Detects Lambda runtime via `AWS_LAMBDA_RUNTIME_API` env var.
//! - Lambda: `lambda_http::run(app)` — API Gateway v2 → HTTP
//! - Local: `axum::serve(listener, app)` — standard TCP server

use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt};

use affcd_satellite::config::Config;
use affcd_satellite::events::{Observers, TracingObserver};
use affcd_satellite::session::AnyBackend;
use affcd_satellite::session::dynamodb::DynamoDbBackend;
use affcd_satellite::session::memory::InMemoryBackend;
use affcd_satellite::session::reaper::spawn_reaper;
use affcd_satellite::session::store::SessionLayer;
use affcd_satellite::signer::Signer;
use affcd_satellite::{AppState, create_app};

#[tokio::main]
async fn main() -> ExitCode {
    let is_lambda = env::var("AWS_LAMBDA_RUNTIME_API").is_ok();

    // Init tracing: JSON for Lambda, pretty for local
    if is_lambda {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        // Load .env for local dev
        let _ = dotenvy::dotenv();
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Session backend: DynamoDB for production, InMemory for dev
    let backend: AnyBackend = if config.session_backend == "dynamodb" {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let dynamo_client = if config.dynamodb_endpoint.is_empty() {
            aws_sdk_dynamodb::Client::new(&sdk_config)
        } else {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                .endpoint_url(&config.dynamodb_endpoint)
                .build();
            aws_sdk_dynamodb::Client::from_conf(dynamo_config)
        };
        tracing::info!(
            "Using DynamoDB session backend (table: {})",
            config.dynamodb_table
        );
        AnyBackend::DynamoDb(DynamoDbBackend::new(
            dynamo_client,
            config.dynamodb_table.clone(),
        ))
    } else {
        tracing::info!("Using in-memory session backend");
        AnyBackend::Memory(InMemoryBackend::new())
    };

    let session_layer = Arc::new(
        SessionLayer::new(Arc::new(backend), config.session_config())
            .with_observers(Observers::new().with(Arc::new(TracingObserver))),
    );

    let signer = Signer::from_config(reqwest::Client::new(), &config);

    let state = Arc::new(AppState {
        config: config.clone(),
        signer,
        session_layer: session_layer.clone(),
    });

    let app = create_app(state);

    if is_lambda {
        // Lambda instances are short-lived; the table's TTL sweep reclaims records there.
        tracing::info!("Starting in Lambda mode");
        if let Err(e) = lambda_http::run(app).await {
            tracing::error!("Lambda runtime error: {}", e);
            return ExitCode::FAILURE;
        }
    } else {
        let _reaper = spawn_reaper(
            session_layer,
            Duration::from_secs(config.reap_interval_secs.max(1)),
        );

        let addr = format!("0.0.0.0:{}", config.port);
        tracing::info!("Starting local server on {}", addr);
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!("Failed to bind {}: {}", addr, e);
                return ExitCode::FAILURE;
            }
        };
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service).await {
            tracing::error!("Server error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
