pub mod csv_export;
pub mod producer;
pub mod store;
pub mod worker;
