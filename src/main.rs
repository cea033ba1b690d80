use std::net::SocketAddr;

use axum::middleware;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ride_dispatch_backend::{
    config::Config,
    db,
    entities::user::{self, UserRole},
    handlers::users::hash_password,
    middleware::rate_limit::{create_global_governor, log_request},
    routes, AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_dispatch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    seed_superadmin(&db, &config).await;

    let state = AppState {
        db,
        config: config.clone(),
    };

    // Outermost first: per-IP limit, then logging, tracing and CORS
    let app = routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(create_global_governor())
            .layer(middleware::from_fn(log_request))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
    );

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

/// Seed the superadmin account if it doesn't exist
async fn seed_superadmin(db: &sea_orm::DatabaseConnection, config: &Config) {
    let email = config.admin_email.trim().to_lowercase();

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await
        .expect("Failed to check for superadmin");

    if existing.is_none() {
        let password_hash =
            hash_password(&config.admin_password).expect("Failed to hash superadmin password");

        let admin = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            name: Set("Super Admin".to_string()),
            role: Set(UserRole::SuperAdmin),
            ..Default::default()
        };

        admin.insert(db).await.expect("Failed to create superadmin");
        tracing::info!("Superadmin account created: {}", email);
    }
}
