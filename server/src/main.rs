mod api;
mod auth;
mod commands;
mod config;
mod db;
mod error;
mod models;
mod schema;
mod store;
mod telemetry;
mod types;

use anyhow::{Context, Result};
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware;
use axum::Router;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers
pub type AppState = Arc<db::DbPool>;

#[derive(Parser)]
#[command(name = "foodgram-server")]
#[command(about = "Foodgram API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Print the OpenAPI document and exit
    Openapi,
    /// Load ingredients from a .json or .csv file
    ImportIngredients {
        #[arg(long)]
        file: PathBuf,
    },
    /// Give an existing user administrator rights
    GrantAdmin {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Openapi) = cli.command {
        let spec = api::openapi()
            .to_pretty_json()
            .context("Failed to serialize OpenAPI document")?;
        println!("{}", spec);
        return Ok(());
    }

    telemetry::init_telemetry();

    let config = config::Config::from_env()?;
    let pool: AppState = Arc::new(db::create_pool(&config.database_url)?);

    match cli.command {
        Some(Commands::ImportIngredients { file }) => {
            let inserted = commands::import_ingredients_file(&pool, &file)?;
            println!("Imported {} new ingredients", inserted);
            Ok(())
        }
        Some(Commands::GrantAdmin { email }) => commands::grant_admin(&pool, &email),
        Some(Commands::Serve) | Some(Commands::Openapi) | None => serve(config, pool).await,
    }
}

fn app(pool: AppState, track_db_query_count: bool) -> Router {
    // Everything under /api/users needs a session; other routers check per handler
    let users_router = api::users::router().layer(middleware::from_fn_with_state(
        pool.clone(),
        auth::require_auth,
    ));

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    Router::new()
        .merge(api::public::router())
        .nest("/api/tags", api::tags::router())
        .nest("/api/ingredients", api::ingredients::router())
        .nest("/api/recipes", api::recipes::router())
        .nest("/api/users", users_router)
        .merge(swagger_ui)
        .with_state(pool)
        .layer(middleware::from_fn_with_state(
            track_db_query_count,
            telemetry::db_query_count_header_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    // Swagger assets are noisy
                    if matched_path.starts_with("/swagger-ui") {
                        tracing::trace_span!("http_request")
                    } else {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            path = %matched_path,
                        )
                    }
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        if span.metadata().map(|m| m.level()) == Some(&tracing::Level::TRACE) {
                            return;
                        }
                        let status = response.status().as_u16();
                        let db_queries = telemetry::get_query_count().unwrap_or(0);
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                db_queries,
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                db_queries,
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(telemetry::query_counting_middleware))
}

async fn serve(config: config::Config, pool: AppState) -> Result<()> {
    let app = app(pool, config.track_db_query_count);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec available at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
