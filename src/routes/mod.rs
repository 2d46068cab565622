//! Router Module Index
//!
//! Each module owns a disjoint path namespace below the API mount. Registration
//! order is the order of `ROUTE_MODULES`; appending a module is the only way to add
//! API routes.

use crate::AppState;
use axum::Router;

/// Identity provider delegation (`/auth/*`).
pub mod auth;

/// Prefix under which every API route is reachable.
pub const API_MOUNT: &str = "/api";

/// A route module: builds its routes relative to `API_MOUNT`.
pub type RouteModule = fn() -> Router<AppState>;

/// The fixed, ordered list of API route modules.
pub const ROUTE_MODULES: &[RouteModule] = &[auth::auth_routes];

/// api_routes
///
/// Merges `ROUTE_MODULES` in array order into the router that gets nested under
/// `API_MOUNT`.
pub fn api_routes() -> Router<AppState> {
    ROUTE_MODULES
        .iter()
        .fold(Router::new(), |router, module| router.merge(module()))
}
