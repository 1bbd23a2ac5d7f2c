#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Tenant-aware client for the academy REST API.
//!
//! ```no_run
//! # async fn demo(client: academy_api::ApiClient) -> Result<(), academy_api::ApiError> {
//! client.login("teacher01", "secret").await?;
//! let students: serde_json::Value = client.get("/students/").send_json().await?;
//! # let _ = students;
//! # Ok(())
//! # }
//! ```
//!
//! Requests carry `X-Tenant-Code` when a tenant resolves and
//! `Authorization: Bearer` when a session exists. A 401 is answered with a
//! single shared token refresh and one replay of the request.

mod account;
mod client;
mod config;
mod error;
mod interceptor;

pub use account::{TenantRole, User};
pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use config::{ApiConfig, LOGIN_PATH, ME_PATH, REFRESH_PATH};
pub use error::{ApiError, ApiErrorKind};
pub use interceptor::{PreparedHeaders, RequestInterceptor, TENANT_HEADER};
