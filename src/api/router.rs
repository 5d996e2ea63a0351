//! API router.
//!
//! All routes live under `/api/`. Login, password reset, and the health
//! probe are open; everything else requires a bearer session, and the
//! user-management routes additionally require the admin role.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::AppState;

pub fn clinic_api_router(state: Arc<AppState>) -> Router {
    build_router(ApiContext::new(state))
}

fn build_router(ctx: ApiContext) -> Router {
    // Admin-only routes get an extra gate inside the session layer.
    let admin = Router::new()
        .route(
            "/auth/users",
            get(endpoints::auth::list_users).post(endpoints::auth::create_user),
        )
        .route("/auth/users/:id", put(endpoints::auth::update_user))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_admin));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/auth/password-change", post(endpoints::auth::password_change))
        .route(
            "/auth/me",
            get(endpoints::auth::me).put(endpoints::auth::update_me),
        )
        .route("/auth/sessions", get(endpoints::auth::sessions))
        .route("/auth/sessions/:id", delete(endpoints::auth::end_session))
        .route("/auth/theme-toggle", post(endpoints::auth::theme_toggle))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/recent", get(endpoints::patients::recent))
        .route("/patients/favorites", get(endpoints::patients::favorites))
        .route("/patients/bulk-action", post(endpoints::patients::bulk_action))
        .route(
            "/patients/:id",
            get(endpoints::patients::detail).put(endpoints::patients::edit),
        )
        .route(
            "/patients/:id/toggle-status",
            post(endpoints::patients::toggle_status),
        )
        .route(
            "/patients/:id/toggle-favorite",
            post(endpoints::patients::toggle_favorite),
        )
        .route("/patients/:id/allergies", post(endpoints::patients::add_allergy))
        .route("/patients/:id/conditions", post(endpoints::patients::add_condition))
        .route(
            "/patients/:id/medications",
            post(endpoints::patients::add_medication),
        )
        .route(
            "/patients/:id/medical-history",
            post(endpoints::patients::add_medical_history),
        )
        .route(
            "/patients/:id/family-history",
            post(endpoints::patients::add_family_history),
        )
        .route(
            "/patients/:id/immunizations",
            post(endpoints::patients::add_immunization),
        )
        .route("/patients/:id/vitals", post(endpoints::patients::add_vitals))
        .route("/patients/:id/notes", post(endpoints::patients::add_note))
        .route(
            "/appointments",
            get(endpoints::appointments::list).post(endpoints::appointments::create),
        )
        .route("/appointments/calendar", get(endpoints::appointments::calendar))
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail).put(endpoints::appointments::edit),
        )
        .route(
            "/appointments/:id/status",
            post(endpoints::appointments::update_status),
        )
        .route(
            "/appointments/:id/prescriptions",
            post(endpoints::appointments::add_prescription),
        )
        .route(
            "/appointments/:id/lab-orders",
            post(endpoints::appointments::add_lab_order),
        )
        .route(
            "/appointments/:id/follow-ups",
            post(endpoints::appointments::add_follow_up),
        )
        .route(
            "/follow-ups/:id/schedule",
            post(endpoints::appointments::schedule_follow_up),
        )
        .route(
            "/appointment-types",
            get(endpoints::appointments::list_types).post(endpoints::appointments::create_type),
        )
        .route(
            "/appointment-types/:id",
            put(endpoints::appointments::edit_type),
        )
        .route(
            "/appointment-types/:id/toggle",
            post(endpoints::appointments::toggle_type),
        )
        .route("/dashboard", get(endpoints::dashboard::overview))
        .route("/dashboard/bmi", get(endpoints::dashboard::bmi))
        .with_state(ctx.clone())
        .merge(admin)
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        // Extension must be outermost so the middleware can see ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/password-reset", post(endpoints::auth::password_reset))
        .with_state(ctx);

    Router::new().nest("/api", protected).nest("/api", unprotected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    use crate::auth::{self, NewUserInput};
    use crate::models::enums::Role;

    fn seeded_router(role: Role) -> (Router, String) {
        let state = Arc::new(AppState::in_memory().unwrap());
        let now = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let token = {
            let conn = state.lock_db().unwrap();
            auth::create_user(
                &conn,
                &NewUserInput {
                    email: "user@clinic.test".into(),
                    first_name: "Dana".into(),
                    last_name: "Reyes".into(),
                    role,
                    phone_number: None,
                    password: "hunter2hunter2".into(),
                },
                now,
            )
            .unwrap();
            auth::login(
                &conn,
                "user@clinic.test",
                "hunter2hunter2",
                &auth::RequestMeta::default(),
                now,
            )
            .unwrap()
            .token
        };
        (clinic_api_router(state), token)
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn patient_body(mrn: &str) -> serde_json::Value {
        serde_json::json!({
            "medical_record_number": mrn,
            "first_name": "Avery",
            "last_name": "Lund",
            "preferred_name": null,
            "date_of_birth": "1985-04-02",
            "gender": "F",
            "email": null,
            "phone_primary": "555-0100",
            "phone_emergency": null,
            "address": "1 Main St",
            "emergency_contact_name": "Kin",
            "emergency_contact_relation": "spouse",
            "emergency_contact_phone": "555-0101",
            "insurance_provider": null,
            "insurance_member_id": null,
            "blood_type": "O+"
        })
    }

    #[tokio::test]
    async fn health_is_open() {
        let (router, _) = seeded_router(Role::Doctor);
        let response = router.oneshot(get("/api/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (router, _) = seeded_router(Role::Doctor);
        let response = router.oneshot(get("/api/patients", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (router, _) = seeded_router(Role::Doctor);
        let response = router
            .oneshot(get("/api/patients", Some("not-a-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_issues_a_usable_token() {
        let (router, token) = seeded_router(Role::Doctor);
        let response = router
            .oneshot(get("/api/patients", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn patient_create_then_detail_round_trip() {
        let (router, token) = seeded_router(Role::Doctor);
        let response = router
            .clone()
            .oneshot(post_json("/api/patients", Some(&token), patient_body("MRN-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        let id = created["patient"]["id"].as_str().unwrap().to_string();

        let response = router
            .oneshot(get(&format!("/api/patients/{id}"), Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let detail = json_body(response).await;
        assert_eq!(detail["patient"]["medical_record_number"], "MRN-1");
        assert_eq!(detail["is_favorite"], false);
    }

    #[tokio::test]
    async fn duplicate_mrn_is_a_400() {
        let (router, token) = seeded_router(Role::Doctor);
        let first = router
            .clone()
            .oneshot(post_json("/api/patients", Some(&token), patient_body("MRN-1")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = router
            .oneshot(post_json("/api/patients", Some(&token), patient_body("MRN-1")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        let json = json_body(second).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn user_management_is_admin_only() {
        let (router, token) = seeded_router(Role::Nurse);
        let response = router
            .oneshot(get("/api/auth/users", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let (router, token) = seeded_router(Role::Admin);
        let response = router
            .oneshot(get("/api/auth/users", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_appointment_status_is_a_400() {
        let (router, token) = seeded_router(Role::Doctor);

        // Seed a patient, a type, and an appointment through the API.
        let patient = json_body(
            router
                .clone()
                .oneshot(post_json("/api/patients", Some(&token), patient_body("MRN-1")))
                .await
                .unwrap(),
        )
        .await;
        let type_created = json_body(
            router
                .clone()
                .oneshot(post_json(
                    "/api/appointment-types",
                    Some(&token),
                    serde_json::json!({ "name": "Consultation", "duration_minutes": 30 }),
                ))
                .await
                .unwrap(),
        )
        .await;

        // The seeded doctor is the provider; its id comes off the session.
        let provider_id = {
            let response = router
                .clone()
                .oneshot(get("/api/auth/sessions", Some(&token)))
                .await
                .unwrap();
            let sessions = json_body(response).await;
            sessions[0]["user_id"].as_str().unwrap().to_string()
        };

        let appointment = json_body(
            router
                .clone()
                .oneshot(post_json(
                    "/api/appointments",
                    Some(&token),
                    serde_json::json!({
                        "patient_id": patient["patient"]["id"],
                        "appointment_type_id": type_created["id"],
                        "provider_id": provider_id,
                        "start_time": "2024-06-01T09:00:00",
                        "reason": "checkup",
                        "notes": null
                    }),
                ))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(appointment["end_time"], "2024-06-01T09:30:00");
        let appointment_id = appointment["id"].as_str().unwrap();

        let response = router
            .clone()
            .oneshot(post_json(
                &format!("/api/appointments/{appointment_id}/status"),
                Some(&token),
                serde_json::json!({ "status": "booked" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Row is unchanged.
        let detail = json_body(
            router
                .oneshot(get(&format!("/api/appointments/{appointment_id}"), Some(&token)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(detail["appointment"]["status"], "scheduled");
    }

    #[tokio::test]
    async fn status_update_on_unknown_appointment_is_a_404() {
        let (router, token) = seeded_router(Role::Doctor);
        let response = router
            .oneshot(post_json(
                &format!("/api/appointments/{}/status", uuid::Uuid::new_v4()),
                Some(&token),
                serde_json::json!({ "status": "confirmed" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let (router, token) = seeded_router(Role::Doctor);
        let response = router
            .clone()
            .oneshot(post_json("/api/auth/logout", Some(&token), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = router
            .oneshot(get("/api/patients", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bmi_calculator_rejects_zero_height() {
        let (router, token) = seeded_router(Role::Doctor);
        let response = router
            .clone()
            .oneshot(get("/api/dashboard/bmi?height_cm=180&weight_kg=81", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["bmi"], 25.0);

        let response = router
            .oneshot(get("/api/dashboard/bmi?height_cm=0&weight_kg=81", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
