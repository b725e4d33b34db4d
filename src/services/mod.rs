pub mod file_store;
pub mod firmware;
pub mod upload;
