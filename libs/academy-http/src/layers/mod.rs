//! Tower layers for the HTTP client.

mod identity;

pub use identity::{
    CLIENT_NAME_HEADER, CLIENT_VERSION_HEADER, ClientIdentityLayer, ClientIdentityService,
};
