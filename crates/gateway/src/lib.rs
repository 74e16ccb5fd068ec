#![deny(unused)]
//! HTTP front for prefixgate.
//!
//! This crate resolves `/{lang}/{clientApp}/` prefixes and serves them
//! through an Axum middleware.

pub mod middleware;
pub mod resolver;
pub mod server;
pub mod trailing_slash;

pub use middleware::{prefix_middleware, PrefixState, RequestPrefix};
pub use resolver::{
    resolve_prefix, PathPrefixResolver, PrefixRequest, RedirectKind, Resolution, Vary, ONE_YEAR_IN_SECONDS,
};
pub use server::{GatewayConfig, GatewayServer};
