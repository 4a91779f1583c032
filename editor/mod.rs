pub mod api;
pub mod chat;
pub mod download;
pub mod session;
pub mod tool;
pub mod upload;
