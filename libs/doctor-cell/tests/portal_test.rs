use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Local, NaiveTime};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::router::doctor_routes;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn app(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_database_url(&server.uri());
    (doctor_routes(config.to_state()), config)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, JwtTestUtils::bearer(token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requires_a_token() {
    let server = MockServer::start().await;
    let (app, _) = app(&server);

    let response = app.oneshot(request(Method::GET, "/dashboard", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejects_patients() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);

    let response = app.oneshot(request(Method::GET, "/dashboard", Some(&token), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Access denied. Insufficient permissions.");
}

#[tokio::test]
async fn availability_requires_slot_array() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::doctor("d@hospital.com"), &config.jwt_secret, None);

    let response = app
        .oneshot(request(Method::POST, "/availability", Some(&token), Some(json!({ "slots": "monday" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "slots array is required");
}

#[tokio::test]
async fn dashboard_reports_week_and_patients() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let doctor = TestUser::doctor("meera@hospital.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);
    let today = Local::now().date_naive();
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor_row(doctor.id, "Meera", "Nair", None, true)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.Booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(Uuid::new_v4(), Uuid::new_v4(), doctor.id, today, nine, "Booked")
        ])))
        .mount(&server)
        .await;

    let patient_a = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "patient_id,patient:patients(id,first_name,last_name,date_of_birth,contact_number,gender,blood_group)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "patient_id": patient_a, "patient": { "id": patient_a, "first_name": "Ravi", "last_name": "Verma" } },
            { "patient_id": patient_a, "patient": { "id": patient_a, "first_name": "Ravi", "last_name": "Verma" } }
        ])))
        .mount(&server)
        .await;

    let response = app.oneshot(request(Method::GET, "/dashboard", Some(&token), None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["doctor"]["first_name"], "Meera");
    assert_eq!(body["today_appointments"].as_array().unwrap().len(), 1);
    assert_eq!(body["assigned_patients_count"], 1);
}

#[tokio::test]
async fn completing_someone_elses_appointment_is_forbidden() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let doctor = TestUser::doctor("meera@hospital.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(
                appointment_id,
                Uuid::new_v4(),
                Uuid::new_v4(),
                Local::now().date_naive(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                "Booked"
            )
        ])))
        .mount(&server)
        .await;

    let uri = format!("/appointments/{}/complete", appointment_id);
    let response = app
        .oneshot(request(Method::POST, &uri, Some(&token), Some(json!({ "diagnosis": "Flu" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Unauthorized");
}
