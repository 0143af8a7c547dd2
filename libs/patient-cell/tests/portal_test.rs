use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local, NaiveTime};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::router::patient_routes;
use shared_utils::test_utils::{JwtTestUtils, MockRows, TestConfig, TestUser};

fn app(server: &MockServer) -> (Router, TestConfig) {
    let config = TestConfig::with_database_url(&server.uri());
    (patient_routes(config.to_state()), config)
}

fn request(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, JwtTestUtils::bearer(token));
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

async fn mount_patient(server: &MockServer, patient: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::patient_row(patient.id, "Ravi", "Verma", true)
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn doctors_are_off_limits() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::doctor("d@hospital.com"), &config.jwt_secret, None);

    let response = app.oneshot(request(Method::GET, "/profile", &token, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_needs_a_query() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);

    let response = app
        .oneshot(request(Method::GET, "/doctors/search?search=%20", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Search query is required");
}

#[tokio::test]
async fn search_returns_active_matches_only() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);
    let cardiology = (Uuid::new_v4(), "Cardiology");

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::doctor_row(Uuid::new_v4(), "Meera", "Nair", Some(cardiology), true),
            MockRows::doctor_row(Uuid::new_v4(), "Arjun", "Das", Some(cardiology), false),
            MockRows::doctor_row(Uuid::new_v4(), "Kavya", "Iyer", None, true)
        ])))
        .mount(&server)
        .await;

    let response = app
        .oneshot(request(Method::GET, "/doctors/search?search=cardio", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let doctors = body.as_array().unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0]["first_name"], "Meera");
}

#[tokio::test]
async fn malformed_doctor_id_is_a_json_bad_request() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);

    let response = app
        .oneshot(request(Method::GET, "/doctors/not-a-uuid", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let message = json_body(response).await["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Invalid URL"), "unexpected message: {}", message);
}

#[tokio::test]
async fn unknown_department_is_not_found() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);

    Mock::given(method("GET"))
        .and(path("/rest/v1/departments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let uri = format!("/departments/{}/doctors", Uuid::new_v4());
    let response = app.oneshot(request(Method::GET, &uri, &token, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "Department not found");
}

#[tokio::test]
async fn booking_returns_created() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let patient = TestUser::patient("ravi@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let doctor_id = Uuid::new_v4();
    let date = Local::now().date_naive() + Duration::days(1);
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    mount_patient(&server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": doctor_id, "account": { "is_active": true } }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::availability_row(Uuid::new_v4(), doctor_id, date, nine, NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "*/0").set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "patient_id": patient.id, "status": "Booked" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::appointment_row(Uuid::new_v4(), patient.id, doctor_id, date, nine, "Booked")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let body = json!({
        "doctor_id": doctor_id,
        "scheduled_date": date.format("%Y-%m-%d").to_string(),
        "scheduled_time": "09:00",
        "reason": "Chest pain"
    });
    let response = app
        .oneshot(request(Method::POST, "/appointments", &token, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Appointment booked successfully");
    assert_eq!(body["appointment"]["status"], "Booked");
}

#[tokio::test]
async fn cannot_cancel_another_patients_appointment() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let token = JwtTestUtils::create_test_token(&TestUser::patient("p@example.com"), &config.jwt_secret, None);
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
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                "Booked"
            )
        ])))
        .mount(&server)
        .await;

    let uri = format!("/appointments/{}/cancel", appointment_id);
    let response = app.oneshot(request(Method::POST, &uri, &token, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["message"], "Unauthorized");
}

#[tokio::test]
async fn profile_update_rejects_taken_username() {
    let server = MockServer::start().await;
    let (app, config) = app(&server);
    let patient = TestUser::patient("ravi@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    mount_patient(&server, &patient).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("username", "eq.meera"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-0/1").set_body_json(json!([{}])))
        .mount(&server)
        .await;

    let response = app
        .oneshot(request(Method::PUT, "/profile", &token, Some(json!({ "username": "meera" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Username already exists");
}
