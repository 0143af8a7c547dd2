use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use appointment_cell::models::SlotInput;
use appointment_cell::services::availability::AvailabilityService;
use appointment_cell::AppointmentError;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockRows, TestConfig};

fn service(server: &MockServer) -> AvailabilityService {
    let config = TestConfig::with_database_url(&server.uri()).to_app_config();
    AvailabilityService::new(SupabaseClient::new(&config))
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn input(date: &str, start: &str, end: &str) -> SlotInput {
    SlotInput {
        date: Some(date.to_string()),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
    }
}

async fn requests(server: &MockServer, verb: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == verb)
        .collect()
}

fn json_body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn open_slots_only_subtract_booked_appointments() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("is_available", "eq.true"))
        .and(query_param("available_date", "gte.2025-03-10"))
        .and(query_param("available_date", "lte.2025-03-17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::availability_row(Uuid::new_v4(), doctor_id, today(), at(10, 0), at(10, 30)),
            MockRows::availability_row(Uuid::new_v4(), doctor_id, today(), at(9, 0), at(9, 30)),
            MockRows::availability_row(Uuid::new_v4(), doctor_id, today(), at(11, 0), at(11, 30))
        ])))
        .mount(&server)
        .await;

    // Cancelled and completed rows never reach the subtraction.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "scheduled_date,scheduled_time"))
        .and(query_param("status", "eq.Booked"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "scheduled_date": "2025-03-10", "scheduled_time": "10:00:00" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let open = service(&server).open_slots(doctor_id, today()).await.unwrap();
    let starts: Vec<NaiveTime> = open.iter().map(|s| s.start_time).collect();

    assert_eq!(starts, vec![at(9, 0), at(11, 0)]);
}

#[tokio::test]
async fn replace_week_clears_window_and_inserts_valid_slots() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("available_date", "gte.2025-03-10"))
        .and(query_param("available_date", "lte.2025-03-17"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::availability_row(Uuid::new_v4(), doctor_id, today(), at(9, 0), at(9, 30))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let slots = vec![
        input("2025-03-10", "09:00", "09:30"),
        input("2025-03-10", "11:00", "10:00"),
        input("2025-03-25", "09:00", "09:30"),
    ];

    let created = service(&server).replace_week(doctor_id, &slots, today()).await.unwrap();
    assert_eq!(created.len(), 1);

    let posts = requests(&server, "POST").await;
    assert_eq!(
        json_body(&posts[0]),
        json!([{
            "doctor_id": doctor_id,
            "available_date": "2025-03-10",
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "is_available": true
        }])
    );
}

#[tokio::test]
async fn failed_insert_restores_previous_week() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let kept = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::availability_row(kept, doctor_id, today(), at(14, 0), at(14, 30))
        ])))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "unavailable" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::availability_row(kept, doctor_id, today(), at(14, 0), at(14, 30))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let result = service(&server)
        .replace_week(doctor_id, &[input("2025-03-11", "09:00", "09:30")], today())
        .await;
    assert_matches!(result, Err(AppointmentError::Store(_)));

    let posts = requests(&server, "POST").await;
    assert_eq!(posts.len(), 2);

    let restored = json_body(&posts[1]);
    assert_eq!(restored[0]["id"], json!(kept));
    assert_eq!(restored[0]["start_time"], "14:00:00");
}
