pub mod callback;
pub mod status;
pub mod upload;
