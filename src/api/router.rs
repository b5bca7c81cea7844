//! Router assembly.
//!
//! Registration, login, and the welcome route are public; everything
//! else sits behind the bearer-token middleware. Uploaded documents are
//! served read-only under `/uploads`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::chatbot::ChatbotClient;
use crate::core_state::CoreState;
use crate::uploads::MAX_DOCUMENT_BYTES;

/// Build the full application router.
pub fn api_router(core: Arc<CoreState>, chatbot: Arc<dyn ChatbotClient>) -> Router {
    build_router(ApiContext::new(core, chatbot))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Welcome to the MediServer API",
    }))
}

fn build_router(ctx: ApiContext) -> Router {
    let uploads_dir = ctx.core.config.uploads_dir.clone();

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        // Users
        .route("/users", get(endpoints::users::list))
        .route("/users/profile", get(endpoints::users::profile))
        .route("/users/doctors/all", get(endpoints::users::doctors_all))
        .route(
            "/users/doctors/hospital/:hospital_id",
            get(endpoints::users::doctors_by_hospital),
        )
        .route(
            "/users/:id",
            get(endpoints::users::get)
                .put(endpoints::users::update)
                .delete(endpoints::users::delete),
        )
        // Doctors
        .route("/doctors", get(endpoints::doctors::list))
        .route(
            "/doctors/speciality/:speciality",
            get(endpoints::doctors::by_speciality),
        )
        .route(
            "/doctors/specialities/all",
            get(endpoints::doctors::specialities),
        )
        .route("/doctors/:id", get(endpoints::doctors::get))
        .route(
            "/doctors/:id/appointments",
            get(endpoints::doctors::appointments),
        )
        // Hospitals
        .route(
            "/hospitals",
            post(endpoints::hospitals::create).get(endpoints::hospitals::list),
        )
        .route(
            "/hospitals/:id",
            get(endpoints::hospitals::get)
                .put(endpoints::hospitals::update)
                .delete(endpoints::hospitals::delete),
        )
        .route(
            "/hospitals/:id/doctors",
            get(endpoints::hospitals::doctors).post(endpoints::hospitals::add_doctor),
        )
        // Appointments
        .route(
            "/appointments",
            post(endpoints::appointments::create).get(endpoints::appointments::list),
        )
        .route(
            "/appointments/:id",
            get(endpoints::appointments::get)
                .put(endpoints::appointments::update_notes)
                .delete(endpoints::appointments::delete),
        )
        .route(
            "/appointments/:id/status",
            put(endpoints::appointments::set_status),
        )
        .route(
            "/appointments/:id/reschedule",
            put(endpoints::appointments::reschedule),
        )
        // Consultations
        .route(
            "/consultations/add-by-rfid",
            post(endpoints::consultations::add_by_rfid),
        )
        .route(
            "/consultations/patient/:patient_id",
            get(endpoints::consultations::by_patient),
        )
        .route(
            "/consultations/doctor",
            get(endpoints::consultations::by_doctor),
        )
        // Prescriptions
        .route("/prescriptions", post(endpoints::prescriptions::create))
        .route(
            "/prescriptions/patient/:patient_id",
            get(endpoints::prescriptions::by_patient),
        )
        .route(
            "/prescriptions/doctor",
            get(endpoints::prescriptions::by_doctor),
        )
        // RFID
        .route("/rfid", get(endpoints::rfid::list))
        .route("/rfid/assign", post(endpoints::rfid::assign))
        .route("/rfid/user/:rfid_number", get(endpoints::rfid::lookup_user))
        .route(
            "/rfid/:id",
            get(endpoints::rfid::get)
                .put(endpoints::rfid::update)
                .delete(endpoints::rfid::delete),
        )
        // Health conditions
        .route(
            "/health",
            post(endpoints::health::upsert_conditions).get(endpoints::health::own_conditions),
        )
        .route(
            "/health/patient/:id",
            get(endpoints::health::patient_conditions),
        )
        .route(
            "/health/documents",
            post(endpoints::health::upload_document).get(endpoints::health::list_documents),
        )
        .route(
            "/health/documents/:document_id",
            delete(endpoints::health::delete_document),
        )
        // Chatbot
        .route("/chatbot", post(endpoints::chatbot::send))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        // Extension must be outermost so the middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let public = Router::new()
        .route("/", get(root))
        .route("/api/auth/register", post(endpoints::auth::register))
        .route("/api/auth/login", post(endpoints::auth::login))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .merge(public)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 64 * 1024))
        .layer(CorsLayer::permissive())
}
