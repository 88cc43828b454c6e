//! Survarium API client.
//!
//! [`SurvariumClient`] validates parameters, then runs each call in one of
//! three modes:
//! - **stacked**: queued on the client's [`Stack`] when the call asks for it
//!   (or stack mode is on by default) and no explicit delay is given
//! - **delayed**: after a fixed or random wait
//! - **immediate**: right away
//!
//! In stacked mode the stack owns retries and every attempt runs with a
//! retry ceiling of zero. Otherwise the executor retries on its own.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::ask::{AskOptions, Executor};
use crate::config::{ApiDefaults, CallOptions, ClientOptions, Credentials, Delay};
use crate::errors::{ApiError, Result};
use crate::handlers::{
    self, Endpoint, IdLanguageParams, IdParams, LanguageParams, MatchesParams, NewMatchesParams,
    NicknameParams, PageParams, PidLanguageParams, PidParams, PidsParams, QueryDescriptor,
};
use crate::retry::RetryPolicy;
use crate::sign::Signer;
use crate::stack::{QueryMeta, Stack, StackOptions};

/// Client for the Survarium statistics API.
///
/// Cloning is cheap; clones share the HTTP client and the request stack.
/// Must be created inside a tokio runtime, which runs the stack task.
#[derive(Clone, Debug)]
pub struct SurvariumClient {
    executor: Arc<Executor>,
    stack: Stack,
    defaults: ApiDefaults,
    retries: u32,
}

impl SurvariumClient {
    /// Create a client with defaults read from `SV_API_*` variables.
    pub fn new(credentials: Credentials, options: ClientOptions) -> Self {
        Self::with_defaults(credentials, options, ApiDefaults::from_env())
    }

    /// Create a client on top of explicit defaults.
    pub fn with_defaults(credentials: Credentials, options: ClientOptions, defaults: ApiDefaults) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        let key_pub = non_empty(credentials.key_pub).unwrap_or_else(|| defaults.key_pub.clone());
        let key_priv = non_empty(credentials.key_priv).unwrap_or_else(|| defaults.key_priv.clone());
        let api_url = non_empty(credentials.api_url).unwrap_or_else(|| defaults.api_url.clone());

        let policy = RetryPolicy {
            delay_min: defaults.delay_min,
            delay_max: defaults.delay_max,
            ..RetryPolicy::default()
        };
        let retries = options.retries.unwrap_or(defaults.retries);
        let stack = Stack::spawn(StackOptions {
            pause: options.stack_pause.unwrap_or(defaults.stack_pause),
            retries,
            policy: policy.clone(),
        });

        Self {
            executor: Arc::new(Executor::new(api_url, Signer::new(key_pub, key_priv), policy)),
            stack,
            defaults,
            retries,
        }
    }

    pub fn api_url(&self) -> &str {
        self.executor.base_url()
    }

    /// Random wait between the configured delay bounds.
    pub fn delay(&self) -> Duration {
        let min = self.defaults.delay_min;
        let spread = self.defaults.delay_max.saturating_sub(min);
        min + spread.mul_f64(rand::random::<f64>())
    }

    /// Call an endpoint by method name with loosely typed params.
    pub async fn call(&self, method: &str, params: Option<Value>, options: CallOptions) -> Result<Value> {
        let endpoint =
            Endpoint::from_name(method).ok_or_else(|| ApiError::UnknownMethod(method.to_string()))?;
        let descriptor = endpoint.build(params.as_ref())?;
        self.dispatch(endpoint, descriptor, params.unwrap_or(Value::Null), options)
            .await
    }

    async fn dispatch(
        &self,
        endpoint: Endpoint,
        descriptor: QueryDescriptor,
        params: Value,
        options: CallOptions,
    ) -> Result<Value> {
        let retries = options.retries.unwrap_or(self.retries);
        let save_source = options
            .save_source
            .clone()
            .or_else(|| self.defaults.save_source.clone());

        if options.delay.is_none() && (options.stack || self.defaults.stack_mode) {
            let executor = self.executor.clone();
            let ask = AskOptions {
                retries: 0,
                save_source,
            };
            let task = move || {
                let executor = executor.clone();
                let descriptor = descriptor.clone();
                let ask = ask.clone();
                async move { executor.execute(&descriptor, &ask).await }
            };
            return self
                .stack
                .add_with_retries(task, QueryMeta::new(endpoint.name(), params), retries)
                .await;
        }

        if options.delay.is_some() || self.defaults.delay_mode {
            let wait = match options.delay {
                Some(Delay::Fixed(wait)) => wait,
                Some(Delay::Auto) | None => self.delay(),
            };
            tokio::time::sleep(wait).await;
        }

        let ask = AskOptions {
            retries,
            save_source,
        };
        self.executor.execute(&descriptor, &ask).await
    }

    async fn run<P: Serialize>(
        &self,
        endpoint: Endpoint,
        descriptor: Result<QueryDescriptor>,
        params: Option<&P>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = descriptor?;
        let params = params
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or(Value::Null);
        self.dispatch(endpoint, descriptor, params, options).await
    }

    /// Latest match id played.
    pub async fn get_max_match_id(&self, options: CallOptions) -> Result<Value> {
        self.run::<()>(Endpoint::GetMaxMatchId, handlers::get_max_match_id(), None, options)
            .await
    }

    /// Public account id by nickname.
    pub async fn get_public_id_by_nickname(
        &self,
        params: Option<&NicknameParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_public_id_by_nickname(params);
        self.run(Endpoint::GetPublicIdByNickname, descriptor, params, options)
            .await
    }

    /// Nicknames of one or more public ids.
    pub async fn get_nicknames_by_public_ids(
        &self,
        params: Option<&PidsParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_nicknames_by_public_ids(params);
        self.run(Endpoint::GetNicknamesByPublicIds, descriptor, params, options)
            .await
    }

    pub async fn matches_count_by_public_id(
        &self,
        params: Option<&PidParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::matches_count_by_public_id(params);
        self.run(Endpoint::MatchesCountByPublicId, descriptor, params, options)
            .await
    }

    pub async fn get_matches_id_by_public_id(
        &self,
        params: Option<&MatchesParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_matches_id_by_public_id(params);
        self.run(Endpoint::GetMatchesIdByPublicId, descriptor, params, options)
            .await
    }

    pub async fn get_match_statistic(
        &self,
        params: Option<&IdLanguageParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_match_statistic(params);
        self.run(Endpoint::GetMatchStatistic, descriptor, params, options)
            .await
    }

    pub async fn get_user_data(
        &self,
        params: Option<&PidLanguageParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_user_data(params);
        self.run(Endpoint::GetUserData, descriptor, params, options).await
    }

    pub async fn get_user_skills(&self, params: Option<&PidParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_user_skills(params);
        self.run(Endpoint::GetUserSkills, descriptor, params, options)
            .await
    }

    pub async fn get_clan_amounts(&self, options: CallOptions) -> Result<Value> {
        self.run::<()>(Endpoint::GetClanAmounts, handlers::get_clan_amounts(), None, options)
            .await
    }

    pub async fn get_clans(&self, params: Option<&PageParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_clans(params);
        self.run(Endpoint::GetClans, descriptor, params, options).await
    }

    pub async fn get_clan_info(&self, params: Option<&IdParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_clan_info(params);
        self.run(Endpoint::GetClanInfo, descriptor, params, options).await
    }

    pub async fn get_clan_members(&self, params: Option<&IdParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_clan_members(params);
        self.run(Endpoint::GetClanMembers, descriptor, params, options)
            .await
    }

    /// Matches played after a timestamp.
    pub async fn get_new_matches(
        &self,
        params: Option<&NewMatchesParams>,
        options: CallOptions,
    ) -> Result<Value> {
        let descriptor = handlers::get_new_matches(params);
        self.run(Endpoint::GetNewMatches, descriptor, params, options)
            .await
    }

    pub async fn get_slots_dict(&self, params: Option<&LanguageParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_slots_dict(params);
        self.run(Endpoint::GetSlotsDict, descriptor, params, options).await
    }

    pub async fn get_items_dict(&self, params: Option<&LanguageParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_items_dict(params);
        self.run(Endpoint::GetItemsDict, descriptor, params, options).await
    }

    pub async fn get_maps_dict(&self, params: Option<&LanguageParams>, options: CallOptions) -> Result<Value> {
        let descriptor = handlers::get_maps_dict(params);
        self.run(Endpoint::GetMapsDict, descriptor, params, options).await
    }
}
