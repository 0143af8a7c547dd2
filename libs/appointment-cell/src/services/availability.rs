// libs/appointment-cell/src/services/availability.rs
use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::SupabaseClient;
use shared_utils::validation::{parse_date, parse_time};

use crate::error::AppointmentError;
use crate::models::{Availability, AppointmentStatus, BookedSlot, PlannedSlot, SlotInput};

/// Doctors publish availability for today and the next seven days.
pub const BOOKING_WINDOW_DAYS: i64 = 7;

const TIME_FMT: &str = "%H:%M:%S";

pub fn booking_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(BOOKING_WINDOW_DAYS))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FMT).to_string()
}

/// Filters submitted slots down to the ones that can be stored.
///
/// A slot is kept when it has all three fields, they parse, `start < end`,
/// the date lies in the booking window and no earlier slot claimed the same
/// `(date, start)`. Everything else is dropped silently.
pub fn plan_week(slots: &[SlotInput], today: NaiveDate) -> Vec<PlannedSlot> {
    let (window_start, window_end) = booking_window(today);
    let mut seen = HashSet::new();
    let mut planned = Vec::new();

    for slot in slots {
        let (Some(date), Some(start), Some(end)) = (
            slot.date.as_deref(),
            slot.start_time.as_deref(),
            slot.end_time.as_deref(),
        ) else {
            continue;
        };

        let (Ok(date), Ok(start_time), Ok(end_time)) =
            (parse_date(date), parse_time(start), parse_time(end))
        else {
            continue;
        };

        if start_time >= end_time || date < window_start || date > window_end {
            continue;
        }

        if seen.insert((date, start_time)) {
            planned.push(PlannedSlot { date, start_time, end_time });
        }
    }

    planned
}

/// Available slots minus every `(date, start)` held by a booked appointment,
/// ordered by date then start time.
pub fn compute_open_slots(available: Vec<Availability>, booked: &[BookedSlot]) -> Vec<Availability> {
    let taken: HashSet<(NaiveDate, NaiveTime)> = booked
        .iter()
        .map(|b| (b.scheduled_date, b.scheduled_time))
        .collect();

    let mut open: Vec<Availability> = available
        .into_iter()
        .filter(|slot| slot.is_available && !taken.contains(&slot.slot_key()))
        .collect();

    open.sort_by_key(|slot| slot.slot_key());
    open
}

#[derive(Clone)]
pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Availability>, AppointmentError> {
        let mut path = format!("/rest/v1/doctor_availability?doctor_id=eq.{}", doctor_id);
        if let Some(start) = start {
            path.push_str(&format!("&available_date=gte.{}", format_date(start)));
        }
        if let Some(end) = end {
            path.push_str(&format!("&available_date=lte.{}", format_date(end)));
        }
        path.push_str("&order=available_date.asc,start_time.asc");

        Ok(self.supabase.select(&path).await?)
    }

    /// Replaces the doctor's availability inside the booking window.
    ///
    /// The window is snapshotted before the delete. If the insert fails the
    /// snapshot is written back, so a failed update leaves the old calendar.
    pub async fn replace_week(
        &self,
        doctor_id: Uuid,
        slots: &[SlotInput],
        today: NaiveDate,
    ) -> Result<Vec<Availability>, AppointmentError> {
        let (start, end) = booking_window(today);
        let planned = plan_week(slots, today);

        debug!(
            "Replacing availability for doctor {}: {} of {} slots accepted",
            doctor_id,
            planned.len(),
            slots.len()
        );

        let previous = self.list_for_doctor(doctor_id, Some(start), Some(end)).await?;

        let filter = format!(
            "doctor_id=eq.{}&available_date=gte.{}&available_date=lte.{}",
            doctor_id,
            format_date(start),
            format_date(end)
        );
        self.supabase.delete("doctor_availability", &filter).await?;

        let rows: Vec<Value> = planned
            .iter()
            .map(|slot| {
                json!({
                    "doctor_id": doctor_id,
                    "available_date": format_date(slot.date),
                    "start_time": format_time(slot.start_time),
                    "end_time": format_time(slot.end_time),
                    "is_available": true
                })
            })
            .collect();

        let created: Vec<Availability> = match self.supabase.insert_many("doctor_availability", rows).await {
            Ok(created) => created,
            Err(e) => {
                error!("Availability insert failed for doctor {}: {}", doctor_id, e);
                self.restore(doctor_id, &previous).await;
                return Err(e.into());
            }
        };
        info!("Stored {} availability slots for doctor {}", created.len(), doctor_id);

        Ok(created)
    }

    async fn restore(&self, doctor_id: Uuid, previous: &[Availability]) {
        let rows: Vec<Value> = previous
            .iter()
            .map(|slot| {
                json!({
                    "id": slot.id,
                    "doctor_id": slot.doctor_id,
                    "available_date": format_date(slot.available_date),
                    "start_time": format_time(slot.start_time),
                    "end_time": format_time(slot.end_time),
                    "is_available": slot.is_available
                })
            })
            .collect();

        match self.supabase.insert_many::<Value>("doctor_availability", rows).await {
            Ok(restored) => warn!("Restored {} availability slots for doctor {}", restored.len(), doctor_id),
            Err(e) => error!("Failed to restore availability for doctor {}: {}", doctor_id, e),
        }
    }

    /// Bookable slots for the next week.
    pub async fn open_slots(&self, doctor_id: Uuid, today: NaiveDate) -> Result<Vec<Availability>, AppointmentError> {
        let (start, end) = booking_window(today);

        let available_path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&is_available=eq.true&available_date=gte.{}&available_date=lte.{}&order=available_date.asc,start_time.asc",
            doctor_id,
            format_date(start),
            format_date(end)
        );
        let available: Vec<Availability> = self.supabase.select(&available_path).await?;

        let booked_path = format!(
            "/rest/v1/appointments?select=scheduled_date,scheduled_time&doctor_id=eq.{}&status=eq.{}&scheduled_date=gte.{}&scheduled_date=lte.{}",
            doctor_id,
            AppointmentStatus::Booked,
            format_date(start),
            format_date(end)
        );
        let booked: Vec<BookedSlot> = self.supabase.select(&booked_path).await?;

        Ok(compute_open_slots(available, &booked))
    }

    /// The available slot starting exactly at `time`, if any.
    pub async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Availability>, AppointmentError> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&available_date=eq.{}&start_time=eq.{}&is_available=eq.true&limit=1",
            doctor_id,
            format_date(date),
            format_time(time)
        );

        Ok(self.supabase.select_one(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
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

    fn slot(date: NaiveDate, start: NaiveTime) -> Availability {
        Availability {
            id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            available_date: date,
            start_time: start,
            end_time: start + Duration::minutes(30),
            is_available: true,
        }
    }

    #[test]
    fn window_spans_eight_calendar_days() {
        assert_eq!(booking_window(day(1)), (day(1), day(8)));
    }

    #[test]
    fn plan_week_drops_invalid_slots() {
        let today = day(10);
        let slots = vec![
            input("2025-03-10", "09:00", "09:30"),
            input("2025-03-10", "09:00", "10:00"), // duplicate start
            input("2025-03-11", "10:00", "09:00"), // inverted
            input("2025-03-11", "10:00", "10:00"), // empty
            input("2025-03-09", "09:00", "09:30"), // before window
            input("2025-03-18", "09:00", "09:30"), // after window
            input("2025-03-17", "16:00", "16:30"), // last day
            input("11/03/2025", "09:00", "09:30"),
            SlotInput { date: Some("2025-03-12".into()), start_time: None, end_time: Some("10:00".into()) },
        ];

        let planned = plan_week(&slots, today);
        assert_eq!(
            planned,
            vec![
                PlannedSlot { date: day(10), start_time: at(9, 0), end_time: at(9, 30) },
                PlannedSlot { date: day(17), start_time: at(16, 0), end_time: at(16, 30) },
            ]
        );
    }

    #[test]
    fn open_slots_exclude_booked_and_sort() {
        let available = vec![
            slot(day(2), at(9, 0)),
            slot(day(1), at(11, 0)),
            slot(day(1), at(10, 0)),
            slot(day(1), at(9, 0)),
        ];
        let booked = vec![BookedSlot { scheduled_date: day(1), scheduled_time: at(10, 0) }];

        let open = compute_open_slots(available, &booked);
        let keys: Vec<_> = open.iter().map(|s| s.slot_key()).collect();
        assert_eq!(keys, vec![(day(1), at(9, 0)), (day(1), at(11, 0)), (day(2), at(9, 0))]);
    }

    #[test]
    fn open_slots_skip_unavailable_rows() {
        let mut closed = slot(day(1), at(9, 0));
        closed.is_available = false;

        assert!(compute_open_slots(vec![closed], &[]).is_empty());
    }

    #[test]
    fn booking_on_another_day_does_not_hide_slot() {
        let available = vec![slot(day(1), at(9, 0))];
        let booked = vec![BookedSlot { scheduled_date: day(2), scheduled_time: at(9, 0) }];

        assert_eq!(compute_open_slots(available, &booked).len(), 1);
    }
}
