//! Survarium API Crate
//!
//! Client for the Survarium game-statistics HTTP API.
//!
//! # Overview
//!
//! The crate covers:
//! - Parameter validation into request descriptors, before any I/O
//! - HMAC-SHA1 request signing
//! - Retries of transient failures with randomized exponential backoff
//! - An optional serialized request stack that paces calls to respect rate limits
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  SurvariumClient | --> |    handlers      |  (params -> QueryDescriptor)
//! +------------------+     +------------------+
//!          |
//!          |  stacked?
//!          v
//! +------------------+     +------------------+
//! |      Stack       | --> |    Executor      |  (sign, GET, parse, retry)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  serde_json      |  (parsed result)
//!                          +------------------+
//! ```
//!
//! # Example
//!
//! ```no_run
//! use survarium_api::{CallOptions, ClientOptions, Credentials, PageParams, SurvariumClient};
//!
//! # async fn run() -> survarium_api::Result<()> {
//! let client = SurvariumClient::new(Credentials::new("test", "test"), ClientOptions::default());
//! let clans = client
//!     .get_clans(Some(&PageParams::default()), CallOptions::stacked())
//!     .await?;
//! println!("{}", clans);
//! # Ok(())
//! # }
//! ```

pub mod ask;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod retry;
pub mod sign;
pub mod source;
pub mod stack;

pub use ask::{AskOptions, Executor};
pub use client::SurvariumClient;
pub use config::{ApiDefaults, CallOptions, ClientOptions, Credentials, Delay};
pub use errors::{ApiError, Result, RetryClass};
pub use handlers::{
    Endpoint, IdLanguageParams, IdParams, LanguageParams, MatchesParams, NewMatchesParams,
    NicknameParams, OneOrMany, PageParams, ParamSpec, ParamValue, PidLanguageParams, PidParams,
    PidsParams, QueryDescriptor, QueryValue,
};
pub use retry::{retry_allowed, RetryPolicy, RetryState};
pub use sign::{SignedAuthHeader, Signer};
pub use stack::{QueryMeta, Stack, StackOptions};
