pub mod crypto;
pub mod extract;
pub mod storage;
pub mod text;
pub mod token;
pub mod validation;
