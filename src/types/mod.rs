mod access;
mod models;

pub use access::Access;
pub use models::{RepoFile, Repository, User};
