pub mod device;
pub mod manager;
pub mod refresh;
pub mod store;
pub mod token;

pub use device::{DeviceAuthorizationSession, DeviceAuthorizer, DeviceCodeAuthorizer};
pub use manager::{AcquiredToken, LifecycleState, TokenLifecycleManager, TokenSource};
pub use refresh::{OAuthRefresher, TokenRefresher};
pub use store::{FileTokenStore, TokenStore};
pub use token::TokenRecord;
