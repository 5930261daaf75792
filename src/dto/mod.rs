pub mod auth_dto;
pub mod course_dto;
pub mod quiz_dto;
pub mod staff_dto;
