//! Scheduling core shared by the doctor, patient, admin and export cells:
//! availability calendars, slot allocation, booking, status lifecycle and
//! visit history.

pub mod error;
pub mod models;
pub mod services;

pub use error::AppointmentError;
