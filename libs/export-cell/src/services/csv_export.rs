use appointment_cell::models::{Appointment, HistoryEntry};
use appointment_cell::services::availability::{format_date, format_time};

use crate::error::ExportError;

pub const HEADERS: [&str; 13] = [
    "Appointment ID",
    "Date",
    "Time",
    "Doctor",
    "Department",
    "Status",
    "Reason",
    "Visit Type",
    "Diagnosis",
    "Prescription",
    "Medicines",
    "Tests Done",
    "Notes",
];

/// Renders completed visits as CSV. `None` when there is nothing to export.
pub fn render_history(appointments: &[Appointment]) -> Result<Option<String>, ExportError> {
    if appointments.is_empty() {
        return Ok(None);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for entry in appointments.iter().map(HistoryEntry::from) {
        writer.write_record([
            entry.appointment_id.to_string(),
            format_date(entry.date),
            format_time(entry.time),
            entry.doctor,
            entry.department,
            entry.status.to_string(),
            entry.reason,
            entry.visit_type,
            entry.diagnosis,
            entry.prescription,
            entry.medicines,
            entry.tests_done,
            entry.notes,
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;

    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
