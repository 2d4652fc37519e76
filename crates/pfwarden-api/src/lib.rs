// pfwarden-api: Async Rust client for the pfSense web administration console
//
// Drives the console the way a browser does (form login, anti-forgery
// tokens, form posts) and reads configuration through the diagnostic
// script page, exposing typed CRUD for aliases, DNS resolver overrides and
// DHCPv4 static mappings.

mod apply;
mod auth;
pub mod client;
pub mod config_reader;
pub mod coordinator;
pub mod decode;
pub mod error;
pub mod executor;
pub mod form;
pub mod options;
pub mod resource;
pub mod resources;
pub mod scrape;
pub mod session;
pub mod transport;

pub use client::Client;
pub use coordinator::{Coordinator, LockCategory};
pub use error::{Error, Operation};
pub use executor::RawResponse;
pub use options::{ClientOptions, Credentials, RetryPolicy};
pub use resource::ManagedResource;
pub use resources::{
    AliasEntry, DomainOverride, HostOverride, HostOverrideAlias, IpAlias, IpAliasKind, PortAlias,
    PortAliasEntry, StaticMapping,
};
pub use transport::TlsMode;
