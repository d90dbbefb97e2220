// routes.rs - Route table and middleware stacking

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::access::routes::MODULE_ROUTES;
use crate::config;
use crate::handlers::{protected, public};
use crate::middleware::{admin_gate, authenticate_middleware, module_gate, reseller_gate, tenancy_middleware};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/login", post(public::login_post))
        // Authenticated session
        .merge(selection_routes())
        // Gatekept dashboards
        .merge(admin_routes())
        .merge(reseller_routes())
        .merge(module_routes(state.clone()))
        // Global middleware
        .layer(from_fn_with_state(state.clone(), authenticate_middleware))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn selection_routes() -> Router<AppState> {
    use protected::*;

    Router::new()
        .route("/logout", post(logout_post))
        .route("/business-selection", get(business_selection_get))
        .route("/business-selection/:business_id", post(business_select_post))
        .route("/business/switch", post(business_switch_post))
        .route("/access-selection", get(access_selection_get).post(access_selection_post))
        .route("/no-access", get(no_access))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(protected::admin_dashboard))
        .route_layer(from_fn(admin_gate))
}

fn reseller_routes() -> Router<AppState> {
    Router::new()
        .route("/reseller/dashboard", get(protected::reseller_dashboard))
        .route_layer(from_fn(reseller_gate))
}

/// Every declared module route, gatekept and then bound to its tenant.
fn module_routes(state: AppState) -> Router<AppState> {
    let mut router = Router::new();
    for route in MODULE_ROUTES {
        router = match route.module {
            None => router.route(route.path, get(protected::module_dashboard)),
            Some(_) => router.route(route.path, get(protected::module_section)),
        };
    }

    // The gate is the outer layer and runs before the tenant binding
    router
        .route_layer(from_fn_with_state(state.clone(), tenancy_middleware))
        .route_layer(from_fn_with_state(state, module_gate))
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }

    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
