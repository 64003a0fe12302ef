pub mod password;
pub mod token;
pub mod wechat;

pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenService};
pub use wechat::{SocialIdentity, SocialIdentityProvider, SocialLoginError, WechatClient};
