use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::crud;
use crate::handlers::transports::{self, Transports};
use crate::handlers::vendors::{self, Vendors};
use crate::handlers::{
    auth, cities, dashboard, location_costs, locations, navigation, tickets, users,
};
use crate::middleware::auth::{auth_middleware, require_superadmin};
use crate::middleware::rate_limit::create_public_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes (login attempts limited per IP)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .layer(create_public_governor());

    // Any signed-in role
    let account_routes = Router::new()
        .route("/navigation", get(navigation::my_navigation))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Ride tickets (riders book, operators run the ride; checked per handler)
    let ticket_routes = Router::new()
        .route("/create", post(tickets::create_ticket))
        .route("/my-tickets", get(tickets::my_tickets))
        .route("/send-otp/{id}", get(tickets::send_otp))
        .route("/verify-otp/{id}", post(tickets::verify_otp))
        .route("/update-remarks/{id}", put(tickets::update_remarks))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::dashboard_data))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Masters (requires auth + superadmin role)
    let admin_routes = Router::new()
        // Cities
        .route("/cities", get(cities::list_cities).post(cities::create_city))
        .route(
            "/cities/{id}",
            get(cities::get_city)
                .put(cities::update_city)
                .delete(cities::delete_city),
        )
        .route(
            "/cities/{id}/cost-matrix",
            get(location_costs::city_cost_matrix).put(location_costs::save_cost_matrix),
        )
        // Locations
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/locations/{id}",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        // Location costs
        .route(
            "/location-costs",
            get(location_costs::list_location_costs).post(location_costs::create_location_cost),
        )
        .route(
            "/location-costs/city/{city_id}",
            get(location_costs::get_city_location_costs),
        )
        .route(
            "/location-costs/{id}",
            put(location_costs::update_location_cost).delete(location_costs::delete_location_cost),
        )
        // Vendors
        .route(
            "/vendors",
            get(crud::list::<Vendors>).post(vendors::create_vendor),
        )
        .route(
            "/vendors/{id}",
            get(crud::get::<Vendors>)
                .put(vendors::update_vendor)
                .delete(crud::delete::<Vendors>),
        )
        // Transports
        .route(
            "/transports",
            get(crud::list::<Transports>).post(transports::create_transport),
        )
        .route(
            "/transports/{id}",
            get(crud::get::<Transports>)
                .put(transports::update_transport)
                .delete(crud::delete::<Transports>),
        )
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", axum::routing::delete(users::delete_user))
        .route("/users/{id}/role", put(users::update_user_role))
        .layer(middleware::from_fn(require_superadmin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", account_routes)
        .nest("/api/ride-tickets", ticket_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
