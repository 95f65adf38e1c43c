//! The site's controllers.
//!
//! Each controller is a container class named after the struct, the name
//! routes refer to in `config/portico.toml`.

mod admin;
mod auth;
mod dashboard;
mod home;
mod users;

pub use admin::AdminController;
pub use auth::AuthController;
pub use dashboard::DashboardController;
pub use home::HomeController;
pub use users::UsersController;
