#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP transport for the academy API client
//!
//! This crate provides a hyper-based HTTP client with:
//! - Automatic TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - A fixed per-request timeout
//! - Client identification headers (`User-Agent`, `X-Client`, `X-Client-Version`)
//! - Response body size limits
//!
//! Authentication and tenant headers are not this crate's concern; they are
//! attached per request by `academy-api`, which needs to replay requests after
//! a token refresh.
//!
//! # Example
//!
//! ```ignore
//! use academy_http::{ClientIdentity, HttpClient};
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .client_identity(ClientIdentity::new("academy-cli", "0.1.0"))
//!     .build()?;
//!
//! let data: MyData = client
//!     .request(http::Method::GET, "https://api.example.com/api/v1/core/me/")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
pub mod security;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    ClientIdentity, DEFAULT_CLIENT_NAME, HttpClientConfig, TlsRootConfig, TransportSecurity,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{
    CLIENT_NAME_HEADER, CLIENT_VERSION_HEADER, ClientIdentityLayer, ClientIdentityService,
};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
