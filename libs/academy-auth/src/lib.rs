#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Session credentials for the academy client.
//!
//! - [`TokenStore`]: durable access/refresh tokens
//! - [`RefreshCoordinator`]: single-flight gate with a FIFO waiter queue
//! - [`TokenRefresher`] / [`HttpTokenRefresher`]: the refresh endpoint
//! - [`AuthSession`]: ties them together for the request interceptor

mod coordinator;
mod error;
mod refresher;
mod secret;
mod session;
mod store;

pub use coordinator::{Acquired, RefreshCoordinator, RefreshGuard, Waiter};
pub use error::{RefreshError, describe_http_error};
pub use refresher::{HttpTokenRefresher, RefreshedTokens, TokenRefresher};
pub use secret::SecretString;
pub use session::AuthSession;
pub use store::{ACCESS_KEY, REFRESH_KEY, TokenPair, TokenStore};
