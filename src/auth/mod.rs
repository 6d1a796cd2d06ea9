mod credentials;
mod middleware;
mod password;
pub mod session;
mod token;

pub use credentials::{authenticate, register};
pub use middleware::{MaybeUser, RequireUser};
pub use password::PasswordHasher;
pub use token::{Claims, TokenService};
