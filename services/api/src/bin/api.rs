//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, SmtpMailer},
    cache::{ResponseCache, PURGE_INTERVAL},
    config::Config,
    error::ApiError,
    scheduler::ReminderScheduler,
    web::{
        assignments::{
            assignment_stats_handler, create_assignment_handler, delete_assignment_handler,
            list_assignments_handler, update_assignment_handler,
        },
        auth::{login_handler, me_handler, register_handler},
        health_handler,
        notes::{create_note_handler, delete_note_handler, list_notes_handler},
        reminders::trigger_reminders_handler,
        require_auth, ApiDoc, AppState,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use organizer_core::reminder::ReminderPipeline;
use organizer_core::MailService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Mailer & Reminder Pipeline ---
    let mailer = Arc::new(SmtpMailer::new(config.smtp.as_ref()));
    if mailer.test_connection().await {
        info!("Email service connection verified");
    } else {
        info!("Email service unavailable; reminders will be skipped until it is configured");
    }

    let reminders = Arc::new(ReminderPipeline::new(db_adapter.clone(), mailer.clone()));
    let _scheduler = ReminderScheduler::new(reminders.clone(), config.reminder_hour_utc).spawn();

    // --- 4. Build the Shared AppState ---
    let cache = Arc::new(ResponseCache::new());
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        cache: cache.clone(),
        reminders,
    });

    // Periodically drop expired cache entries.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });

    // --- 5. Configure CORS for the SPA ---
    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().map_err(|e| {
            ApiError::Internal(format!("FRONTEND_URL is not a valid origin: {e}"))
        })?)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(me_handler))
        .route(
            "/api/assignments",
            get(list_assignments_handler).post(create_assignment_handler),
        )
        .route("/api/assignments/stats", get(assignment_stats_handler))
        .route(
            "/api/assignments/{id}",
            put(update_assignment_handler).delete(delete_assignment_handler),
        )
        .route("/api/notes", get(list_notes_handler).post(create_note_handler))
        .route("/api/notes/{id}", delete(delete_note_handler))
        .route("/api/trigger-reminders", post(trigger_reminders_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
