// app.rs - Router assembly
//
// Public → Protected (JWT) → Elevated (JWT + admin). Global layers wrap all
// three groups; the shared `AppState` is attached last.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::repository::{CompostRepository, IrrigationRepository, SoilRepository};
use crate::database::Database;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(elevated_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/register", post(auth::register_post))
        .route("/login", post(auth::login_post))
        .route("/wxLogin", post(auth::wx_login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{machine, records, user};

    Router::new()
        .route("/user/info", get(user::info_get))
        .route("/user/bind-phone", post(user::bind_phone_post))
        .route("/user/password", post(user::password_post))
        // Compost
        .route("/compost/save", post(records::save::<CompostRepository>))
        .route("/compost/records", get(records::list::<CompostRepository>))
        .route(
            "/compost/record",
            get(records::get::<CompostRepository>)
                .put(records::update::<CompostRepository>)
                .delete(records::delete::<CompostRepository>),
        )
        // Irrigation
        .route("/irrigation/save", post(records::save::<IrrigationRepository>))
        .route("/irrigation/records", get(records::list::<IrrigationRepository>))
        .route(
            "/irrigation/record",
            get(records::get::<IrrigationRepository>)
                .put(records::update::<IrrigationRepository>)
                .delete(records::delete::<IrrigationRepository>),
        )
        // Soil
        .route("/soil/save", post(records::save::<SoilRepository>))
        .route("/soil/records", get(records::list::<SoilRepository>))
        .route(
            "/soil/record",
            get(records::get::<SoilRepository>)
                .put(records::update::<SoilRepository>)
                .delete(records::delete::<SoilRepository>),
        )
        // Machine codes
        .route("/machine/check", post(machine::check_post))
        .route("/machine/bind", post(machine::bind_post))
        .route(
            "/machine/user/:userId",
            get(machine::user_get).delete(machine::user_delete),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn elevated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/machine/create", post(elevated::machine::create_post))
        // Layers run bottom-up: authenticate first, then check the role.
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.security.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "code": 200,
        "message": "success",
        "data": {
            "name": "Agri API (Rust)",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "public": "/register, /login, /wxLogin, /health",
                "user": "/user/info, /user/bind-phone, /user/password (protected)",
                "records": "/{compost,irrigation,soil}/{save,records,record} (protected)",
                "machine": "/machine/check, /machine/bind, /machine/user/:userId (protected)",
                "admin": "/machine/create (admin)",
            }
        }
    }))
}

async fn health(State(db): State<Database>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "code": 200,
                "message": "success",
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "code": 503,
                    "message": "database unavailable",
                    "error": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
