mod auth;
mod friends;
mod health_check;
mod token;
mod users;

pub(crate) use token::ACCESS_COOKIE;

pub use auth::login;
pub use auth::register;
pub use friends::end_friendship;
pub use friends::start_friendship;
pub use friends::update_friendship;
pub use health_check::health_check;
pub use token::refresh_token;
pub use token::revoke_token;
pub use users::get_users;
