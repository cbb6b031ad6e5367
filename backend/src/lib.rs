//! # Chope Backend
//!
//! REST server for a family chore tracker. Parents assign tasks with coin
//! rewards, children complete them, parents approve them, and children
//! spend what they earn on a virtual pet.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (axum REST handlers, bearer-token extractor)
//!     ↓
//! Domain Layer (services, lifecycle rules, validation)
//!     ↓
//! Storage Layer (SQLite repositories)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Initialize the database and the application state
//! - Build the `/api` router with CORS and request tracing
//! - Keep HTTP concerns out of the domain services

pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::domain::{AnimalService, AuthService, EventService, FamilyService, TaskService};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub family_service: FamilyService,
    pub task_service: TaskService,
    pub animal_service: AnimalService,
    pub event_service: EventService,
}

impl AppState {
    pub fn new(db: DbConnection, jwt_secret: &str, token_ttl: chrono::Duration) -> Self {
        Self {
            auth_service: AuthService::new(db.clone(), jwt_secret, token_ttl),
            family_service: FamilyService::new(db.clone()),
            task_service: TaskService::new(db.clone()),
            animal_service: AnimalService::new(db.clone()),
            event_service: EventService::new(db),
        }
    }
}

/// Open the database and wire up every service
pub async fn initialize_backend(config: &Config) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url).await?;
    Ok(AppState::new(db, &config.jwt_secret, config.token_ttl()))
}

/// Full application router: `/api` routes plus CORS and request tracing
pub fn create_router(app_state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Ok(Router::new()
        .nest("/api", io::rest::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state))
}
