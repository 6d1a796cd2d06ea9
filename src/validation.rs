use crate::error::{Error, Result};

const MAX_USER_NAME_LEN: usize = 64;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_REPOSITORY_NAME_LEN: usize = 100;
const MAX_FILE_NAME_LEN: usize = 255;

fn is_valid_user_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

pub fn validate_user_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("Username cannot be empty".to_string()));
    }
    if name.len() > MAX_USER_NAME_LEN {
        return Err(Error::Validation(format!(
            "Username cannot exceed {MAX_USER_NAME_LEN} characters"
        )));
    }
    if !name.chars().all(is_valid_user_name_char) {
        return Err(Error::Validation(
            "Username can only contain alphanumeric characters, hyphens, underscores, and periods"
                .to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::Validation(format!(
            "Email cannot exceed {MAX_EMAIL_LEN} characters"
        )));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::Validation(format!("'{email}' is not a valid email")));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Repository display names are free text; the bucket name is derived later.
pub fn validate_repository_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "Repository name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_REPOSITORY_NAME_LEN {
        return Err(Error::Validation(format!(
            "Repository name cannot exceed {MAX_REPOSITORY_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("File name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(Error::Validation(format!(
            "File name cannot exceed {MAX_FILE_NAME_LEN} characters"
        )));
    }
    Ok(())
}
