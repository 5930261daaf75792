pub mod course;
pub mod enrollment;
pub mod exam;
pub mod library;
pub mod payment;
pub mod schedule;
pub mod user;
