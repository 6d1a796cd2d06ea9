use serde::{Deserialize, Serialize};

use crate::lifecycle::RepositoryView;
use crate::types::{Repository, User};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepositoryForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFileParams {
    pub bucket_name: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadFileParams {
    pub bucket_name: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct IndexView {
    pub user: Option<User>,
}

/// Describes a form a client should submit.
#[derive(Debug, Serialize)]
pub struct FormView {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct RepositoryListView {
    pub user: User,
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryPage {
    pub user: Option<User>,
    #[serde(flatten)]
    pub view: RepositoryView,
}
