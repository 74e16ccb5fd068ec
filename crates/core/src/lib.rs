#![deny(unused)]
//! Core types, configuration, and error definitions for prefixgate.
//!
//! This crate holds everything the prefix resolver needs that is not HTTP:
//! allow-lists, language tables and negotiation, and User-Agent sniffing.

pub mod client_app;
pub mod config;
pub mod error;
pub mod i18n;

pub use crate::client_app::client_app_from_user_agent;
pub use crate::config::{AllowListConfiguration, AppConfig, HttpConfig, LocaleConfig, ServerConfig};
pub use crate::error::{Error, Result};
pub use crate::i18n::{LangSource, LanguageResolution, TextDirection};
