pub mod availability;
pub mod booking;
pub mod history;
pub mod lifecycle;
