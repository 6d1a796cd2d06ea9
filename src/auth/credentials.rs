use uuid::Uuid;

use super::PasswordHasher;
use crate::error::{Error, Result};
use crate::store::{Store, timestamp_now};
use crate::types::User;
use crate::validation::{validate_email, validate_password, validate_user_name};

/// Creates a user with a salted password hash.
///
/// Fails with `Conflict` when the name or the email is already registered.
pub fn register(
    store: &dyn Store,
    hasher: &PasswordHasher,
    name: &str,
    email: &str,
    password: &str,
) -> Result<User> {
    let name = name.trim();
    let email = email.trim();

    validate_user_name(name)?;
    validate_email(email)?;
    validate_password(password)?;

    if store.get_user_by_name(name)?.is_some() || store.get_user_by_email(email)?.is_some() {
        return Err(Error::Conflict(
            "There is already an account with the same email or username".to_string(),
        ));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hasher.hash(password)?,
        created_at: timestamp_now(),
    };

    // The unique constraints still catch a concurrent registration.
    store.create_user(&user)?;

    tracing::info!("Registered user '{}'", user.name);
    Ok(user)
}

/// Checks a name and password pair.
///
/// Unknown users and wrong passwords both yield `InvalidCredentials`.
pub fn authenticate(
    store: &dyn Store,
    hasher: &PasswordHasher,
    name: &str,
    password: &str,
) -> Result<User> {
    let Some(user) = store.get_user_by_name(name.trim())? else {
        hasher.verify_dummy(password);
        return Err(Error::InvalidCredentials);
    };

    if !hasher.verify(password, &user.password_hash)? {
        return Err(Error::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;

    fn open_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    #[test]
    fn test_register_then_authenticate() {
        let (_temp, store) = open_store();
        let hasher = PasswordHasher::new();

        let user = register(&store, &hasher, "alice", "alice@example.com", "password1").unwrap();
        assert_ne!(user.password_hash, "password1");

        let authed = authenticate(&store, &hasher, "alice", "password1").unwrap();
        assert_eq!(authed, user);
    }

    #[test]
    fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let (_temp, store) = open_store();
        let hasher = PasswordHasher::new();
        register(&store, &hasher, "alice", "alice@example.com", "password1").unwrap();

        let wrong_password = authenticate(&store, &hasher, "alice", "password2").unwrap_err();
        let unknown_user = authenticate(&store, &hasher, "bob", "password1").unwrap_err();

        assert!(matches!(wrong_password, Error::InvalidCredentials));
        assert!(matches!(unknown_user, Error::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn test_duplicate_name_or_email_is_conflict() {
        let (_temp, store) = open_store();
        let hasher = PasswordHasher::new();
        register(&store, &hasher, "alice", "alice@example.com", "password1").unwrap();

        assert!(matches!(
            register(&store, &hasher, "alice", "other@example.com", "password1"),
            Err(Error::Conflict(_))
        ));
        assert!(matches!(
            register(&store, &hasher, "alice2", "alice@example.com", "password1"),
            Err(Error::Conflict(_))
        ));
    }

    #[test]
    fn test_register_validates_input() {
        let (_temp, store) = open_store();
        let hasher = PasswordHasher::new();

        assert!(matches!(
            register(&store, &hasher, "bad name", "a@example.com", "password1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            register(&store, &hasher, "alice", "not-an-email", "password1"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            register(&store, &hasher, "alice", "a@example.com", "short"),
            Err(Error::Validation(_))
        ));
    }
}
