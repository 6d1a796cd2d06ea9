mod account;
pub mod dto;
mod files;
mod repositories;
pub mod response;
mod router;

pub use files::MAX_UPLOAD_BYTES;
pub use router::{AppState, create_router};
