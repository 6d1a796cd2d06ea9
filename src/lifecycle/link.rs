use rand::Rng;
use rand::distributions::Alphanumeric;

pub const LINK_LENGTH: usize = 30;

/// Generates a public link token: 30 random characters from `[A-Za-z0-9]`.
#[must_use]
pub fn generate_link() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LINK_LENGTH)
        .map(char::from)
        .collect()
}
