// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /login - username/password
pub mod register; // POST /register - create a password account
pub mod wechat; // POST /wxLogin - WeChat mini-program login

pub use login::login_post;
pub use register::register_post;
pub use wechat::wx_login_post;
