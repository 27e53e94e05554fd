//! Shared library for the sensor-bot Lambda functions.
//!
//! This crate provides the clients, wire types, and protocol logic used by the
//! webhook Lambda: secret resolution, token caching and refresh, command
//! routing, sensor reads, reply delivery, and the retry policy.

pub mod auth;
pub mod cache;
pub mod config;
pub mod connector;
pub mod error;
pub mod models;
pub mod retry;
pub mod router;
pub mod secrets;
pub mod sensors;

pub use auth::Authenticator;
pub use cache::{DynamoTokenStore, MemoryTokenStore, TokenRecord, TokenStore};
pub use config::Config;
pub use connector::ReplyClient;
pub use error::{Error, Result};
pub use models::{Activity, ReplyActivity, RetryEnvelope};
pub use retry::{Decision, RetryPolicy};
pub use router::Router;
pub use secrets::SecretResolver;
pub use sensors::{Reading, SensorClient, SensorKind, SensorTarget, SensorValue};
