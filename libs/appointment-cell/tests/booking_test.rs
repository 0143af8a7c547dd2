use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{AppointmentStatus, BookAppointmentRequest, TreatmentRequest};
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::lifecycle::LifecycleService;
use appointment_cell::AppointmentError;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockRows, TestConfig};

fn client(server: &MockServer) -> SupabaseClient {
    SupabaseClient::new(&TestConfig::with_database_url(&server.uri()).to_app_config())
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn nine() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

async fn mount_bookable_slot(server: &MockServer, doctor_id: Uuid, date: NaiveDate, booked: u64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": doctor_id, "account": { "is_active": true } }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::availability_row(Uuid::new_v4(), doctor_id, date, nine(), NaiveTime::from_hms_opt(9, 30, 0).unwrap())
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("select", "id"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", format!("*/{}", booked).as_str())
                .set_body_json(json!([])),
        )
        .mount(server)
        .await;
}

fn booking(doctor_id: Uuid, date: NaiveDate) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id: Some(doctor_id.to_string()),
        scheduled_date: Some(date.format("%Y-%m-%d").to_string()),
        scheduled_time: Some("09:00".to_string()),
        reason: Some("Chest pain".to_string()),
    }
}

#[tokio::test]
async fn books_an_open_slot() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let date = today().succ_opt().unwrap();
    mount_bookable_slot(&server, doctor_id, date, 0).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::appointment_row(Uuid::new_v4(), patient_id, doctor_id, date, nine(), "Booked")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let appointment = BookingService::new(client(&server))
        .book(patient_id, booking(doctor_id, date), today())
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Booked);
    assert_eq!(appointment.slot_key(), (date, nine()));
}

#[tokio::test]
async fn booked_slot_is_refused_before_insert() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = today().succ_opt().unwrap();
    mount_bookable_slot(&server, doctor_id, date, 1).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = BookingService::new(client(&server))
        .book(Uuid::new_v4(), booking(doctor_id, date), today())
        .await;

    assert_matches!(result, Err(AppointmentError::SlotTaken));
}

#[tokio::test]
async fn losing_a_booking_race_reports_conflict() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let date = today().succ_opt().unwrap();
    mount_bookable_slot(&server, doctor_id, date, 0).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockRows::unique_violation("unique_booked_slot")))
        .mount(&server)
        .await;

    let result = BookingService::new(client(&server))
        .book(Uuid::new_v4(), booking(doctor_id, date), today())
        .await;

    assert_matches!(result, Err(AppointmentError::SlotConflict));
}

#[tokio::test]
async fn slot_outside_calendar_is_not_available() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": doctor_id, "account": { "is_active": true } }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = BookingService::new(client(&server))
        .book(Uuid::new_v4(), booking(doctor_id, today()), today())
        .await;

    assert_matches!(result, Err(AppointmentError::SlotNotAvailable));
}

#[tokio::test]
async fn blacklisted_doctor_cannot_be_booked() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": doctor_id, "account": { "is_active": false } }
        ])))
        .mount(&server)
        .await;

    let result = BookingService::new(client(&server))
        .book(Uuid::new_v4(), booking(doctor_id, today()), today())
        .await;

    assert_matches!(result, Err(AppointmentError::DoctorUnavailable));
}

#[tokio::test]
async fn cancelling_twice_is_rejected() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(appointment_id, patient_id, Uuid::new_v4(), today(), nine(), "Cancelled")
        ])))
        .mount(&server)
        .await;

    let result = LifecycleService::new(client(&server))
        .cancel_by_patient(patient_id, appointment_id)
        .await;

    assert_matches!(result, Err(AppointmentError::NotCancellable));
}

#[tokio::test]
async fn cancel_racing_a_completion_is_rejected() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(appointment_id, Uuid::new_v4(), doctor_id, today(), nine(), "Booked")
        ])))
        .mount(&server)
        .await;

    // The conditional PATCH matched nothing: another request moved it first.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.Booked"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let result = LifecycleService::new(client(&server))
        .cancel_by_doctor(doctor_id, appointment_id)
        .await;

    assert_matches!(result, Err(AppointmentError::NotCancellable));
}

#[tokio::test]
async fn completion_records_treatment_then_status() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(appointment_id, patient_id, doctor_id, today(), nine(), "Booked")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/treatments"))
        .and(query_param("on_conflict", "appointment_id"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockRows::treatment_row(Uuid::new_v4(), appointment_id, "Influenza")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockRows::appointment_row(appointment_id, patient_id, doctor_id, today(), nine(), "Completed")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let request = TreatmentRequest {
        diagnosis: Some("Influenza".to_string()),
        ..Default::default()
    };

    let (appointment, treatment) = LifecycleService::new(client(&server))
        .complete(doctor_id, appointment_id, request)
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Completed);
    assert_eq!(treatment.diagnosis.as_deref(), Some("Influenza"));
}

#[tokio::test]
async fn completion_requires_a_diagnosis() {
    let server = MockServer::start().await;

    let result = LifecycleService::new(client(&server))
        .complete(Uuid::new_v4(), Uuid::new_v4(), TreatmentRequest::default())
        .await;

    assert_matches!(result, Err(AppointmentError::Validation(msg)) if msg == "diagnosis is required");
}
