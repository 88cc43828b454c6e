//! Request descriptors for every API endpoint.
//!
//! Each builder validates caller parameters and produces a [`QueryDescriptor`]
//! naming the remote path and its ordered query. Builders never touch the
//! network, so bad input fails before any request is made.
//!
//! Identifiers are 64-bit unsigned values. They are kept as given (number or
//! digit string) and never converted through floating point.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ApiError, Result};
use crate::sign::escape;

/// Language used when none is given.
pub const DEFAULT_LANGUAGE: &str = "english";

const DEFAULT_MATCH_AMOUNT: u64 = 10;
const DEFAULT_CLAN_AMOUNT: u64 = 10;
const DEFAULT_NEW_MATCHES_LIMIT: u64 = 50;
const DEFAULT_OFFSET: u64 = 0;
const TIMESTAMP_DIGITS: usize = 10;

/// A numeric parameter as received from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(u64),
    Float(f64),
    Text(String),
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single value or a list of values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
        }
    }
}

/// A validated query value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    Text(String),
    Number(u64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{}", number),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

/// Remote path plus ordered query. Fully determines the outbound URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub path: String,
    pub query: Option<Vec<(String, QueryValue)>>,
}

impl QueryDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
        }
    }

    /// Append a query pair, keeping insertion order.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.query
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Percent-encoded `k=v&k=v` string, empty without a query.
    pub fn query_string(&self) -> String {
        self.query
            .as_ref()
            .map(|pairs| {
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}={}", escape(k), escape(&v.to_string())))
                    .collect::<Vec<_>>()
                    .join("&")
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// Parameter types
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NicknameParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PidsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pids: Option<OneOrMany<ParamValue>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<ParamValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchesParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_amount: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<ParamValue>,
}

/// Match id plus result language. `lang` is accepted as an alias.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdLanguageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParamValue>,
    #[serde(default, alias = "lang", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PidLanguageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<ParamValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParamValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMatchesParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<ParamValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

// ============================================================================
// Validation helpers
// ============================================================================

fn require<P>(params: Option<&P>) -> Result<&P> {
    params.ok_or_else(|| ApiError::validation("no params received"))
}

/// Validate a numeric identifier without converting it.
fn parse_num(value: Option<&ParamValue>, name: &str) -> Result<QueryValue> {
    match value {
        None => Err(ApiError::validation(format!("no {} received", name))),
        Some(ParamValue::Number(number)) => Ok(QueryValue::Number(*number)),
        Some(ParamValue::Float(number)) => {
            if number.is_finite() && *number >= 0.0 && number.fract() == 0.0 && *number < u64::MAX as f64 {
                Ok(QueryValue::Number(*number as u64))
            } else {
                Err(ApiError::validation(format!("{} is incorrect", name)))
            }
        }
        Some(ParamValue::Text(text)) => {
            if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                Ok(QueryValue::Text(text.clone()))
            } else {
                Err(ApiError::validation(format!("{} must be a number", name)))
            }
        }
    }
}

/// Validate a required identifier. Zero and empty text count as missing.
fn parse_id(value: Option<&ParamValue>, name: &str) -> Result<QueryValue> {
    match value {
        Some(value) if !is_falsy(value) => parse_num(Some(value), name),
        _ => Err(ApiError::validation(format!("no {} received", name))),
    }
}

fn is_falsy(value: &ParamValue) -> bool {
    match value {
        ParamValue::Number(number) => *number == 0,
        ParamValue::Float(number) => *number == 0.0 || number.is_nan(),
        ParamValue::Text(text) => text.is_empty(),
    }
}

fn parse_num_or(value: Option<&ParamValue>, name: &str, default: u64) -> Result<QueryValue> {
    match value {
        None => Ok(QueryValue::Number(default)),
        some => parse_num(some, name),
    }
}

fn language(value: Option<&String>) -> QueryValue {
    match value {
        Some(language) if !language.is_empty() => QueryValue::Text(language.clone()),
        _ => QueryValue::from(DEFAULT_LANGUAGE),
    }
}

/// Cut millisecond (or longer) timestamps down to seconds.
fn truncate_timestamp(value: QueryValue) -> QueryValue {
    let text = value.to_string();
    if text.len() > TIMESTAMP_DIGITS {
        QueryValue::Text(text[..TIMESTAMP_DIGITS].to_string())
    } else {
        value
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Latest match id played.
pub fn get_max_match_id() -> Result<QueryDescriptor> {
    Ok(QueryDescriptor::new("getmaxmatchid"))
}

/// Public account id by nickname.
pub fn get_public_id_by_nickname(params: Option<&NicknameParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    match params.nickname.as_deref() {
        Some(nickname) if !nickname.is_empty() => {
            Ok(QueryDescriptor::new("getpublicidbynickname").with("nickname", nickname))
        }
        _ => Err(ApiError::validation("no nickname received")),
    }
}

/// Nicknames for one or more public ids.
pub fn get_nicknames_by_public_ids(params: Option<&PidsParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let pids = match &params.pids {
        Some(pids) if !is_blank(pids) => pids.clone().into_vec(),
        _ => return Err(ApiError::validation("no pids received")),
    };
    if pids.is_empty() {
        return Err(ApiError::validation("should be received at least one pid"));
    }

    let joined = pids
        .iter()
        .map(|pid| parse_num(Some(pid), "pid").map(|v| v.to_string()))
        .collect::<Result<Vec<_>>>()?
        .join(",");

    Ok(QueryDescriptor::new("getnicknamesbypidarray").with("pids", joined.as_str()))
}

fn is_blank(pids: &OneOrMany<ParamValue>) -> bool {
    matches!(pids, OneOrMany::One(value) if is_falsy(value))
}

/// Number of matches played by a public id.
pub fn matches_count_by_public_id(params: Option<&PidParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let pid = parse_id(params.pid.as_ref(), "pid")?;
    Ok(QueryDescriptor::new("getmatchescountbypid").with("pid", pid))
}

/// Page of match ids played by a public id.
pub fn get_matches_id_by_public_id(params: Option<&MatchesParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let pid = parse_id(params.pid.as_ref(), "pid")?;
    let match_amount = parse_num_or(params.match_amount.as_ref(), "matchAmount", DEFAULT_MATCH_AMOUNT)?;
    let offset = parse_num_or(params.offset.as_ref(), "offset", DEFAULT_OFFSET)?;

    Ok(QueryDescriptor::new("getmatchesidbypublicid")
        .with("pid", pid)
        .with("matchAmount", match_amount)
        .with("offset", offset))
}

/// Statistic of a single match.
pub fn get_match_statistic(params: Option<&IdLanguageParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let id = parse_id(params.id.as_ref(), "id")?;
    Ok(QueryDescriptor::new("getmatchstatisticbyid")
        .with("matchid", id)
        .with("language", language(params.language.as_ref())))
}

/// Rating and inventory of a player.
pub fn get_user_data(params: Option<&PidLanguageParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let pid = parse_id(params.pid.as_ref(), "pid")?;
    Ok(QueryDescriptor::new("getuserdatabypid")
        .with("pid", pid)
        .with("language", language(params.language.as_ref())))
}

/// Skill points of a player.
pub fn get_user_skills(params: Option<&PidParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let pid = parse_id(params.pid.as_ref(), "pid")?;
    Ok(QueryDescriptor::new("getuserskills").with("pid", pid))
}

/// Number of active clans.
pub fn get_clan_amounts() -> Result<QueryDescriptor> {
    Ok(QueryDescriptor::new("getclansamount"))
}

/// Page of clans ordered by rating. Params are optional.
pub fn get_clans(params: Option<&PageParams>) -> Result<QueryDescriptor> {
    let default = PageParams::default();
    let params = params.unwrap_or(&default);
    let amount = parse_num_or(params.amount.as_ref(), "amount", DEFAULT_CLAN_AMOUNT)?;
    let offset = parse_num_or(params.offset.as_ref(), "offset", DEFAULT_OFFSET)?;

    Ok(QueryDescriptor::new("getclans")
        .with("amount", amount)
        .with("offset", offset))
}

pub fn get_clan_info(params: Option<&IdParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let id = parse_id(params.id.as_ref(), "id")?;
    Ok(QueryDescriptor::new("getclaninfo").with("clanid", id))
}

pub fn get_clan_members(params: Option<&IdParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let id = parse_id(params.id.as_ref(), "id")?;
    Ok(QueryDescriptor::new("getclanmembers").with("clanid", id))
}

/// Matches played after `timestamp`. Millisecond timestamps are cut to seconds.
pub fn get_new_matches(params: Option<&NewMatchesParams>) -> Result<QueryDescriptor> {
    let params = require(params)?;
    let timestamp = truncate_timestamp(parse_num(params.timestamp.as_ref(), "timestamp")?);
    let limit = parse_num_or(params.limit.as_ref(), "limit", DEFAULT_NEW_MATCHES_LIMIT)?;
    let offset = parse_num_or(params.offset.as_ref(), "offset", DEFAULT_OFFSET)?;

    Ok(QueryDescriptor::new("getnewmatches")
        .with("timestamp", timestamp)
        .with("limit", limit)
        .with("offset", offset))
}

fn dictionary(path: &str, params: Option<&LanguageParams>) -> Result<QueryDescriptor> {
    let language = language(params.and_then(|p| p.language.as_ref()));
    Ok(QueryDescriptor::new(path).with("language", language))
}

pub fn get_slots_dict(params: Option<&LanguageParams>) -> Result<QueryDescriptor> {
    dictionary("getslotsdict", params)
}

pub fn get_items_dict(params: Option<&LanguageParams>) -> Result<QueryDescriptor> {
    dictionary("getitemsdict", params)
}

pub fn get_maps_dict(params: Option<&LanguageParams>) -> Result<QueryDescriptor> {
    dictionary("getmapsdict", params)
}

// ============================================================================
// Dispatch by name
// ============================================================================

/// A named parameter accepted by an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    /// Accepts a comma-separated list when given as text.
    pub list: bool,
}

const fn param(name: &'static str) -> ParamSpec {
    ParamSpec { name, list: false }
}

const NICKNAME: &[ParamSpec] = &[param("nickname")];
const PIDS: &[ParamSpec] = &[ParamSpec {
    name: "pids",
    list: true,
}];
const PID: &[ParamSpec] = &[param("pid")];
const PID_PAGE: &[ParamSpec] = &[param("pid"), param("matchAmount"), param("offset")];
const ID: &[ParamSpec] = &[param("id")];
const ID_LANGUAGE: &[ParamSpec] = &[param("id"), param("language")];
const PID_LANGUAGE: &[ParamSpec] = &[param("pid"), param("language")];
const AMOUNT_OFFSET: &[ParamSpec] = &[param("amount"), param("offset")];
const NEW_MATCHES: &[ParamSpec] = &[param("timestamp"), param("limit"), param("offset")];
const LANGUAGE: &[ParamSpec] = &[param("language")];

/// Every API endpoint, addressable by its method name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GetMaxMatchId,
    GetPublicIdByNickname,
    GetNicknamesByPublicIds,
    MatchesCountByPublicId,
    GetMatchesIdByPublicId,
    GetMatchStatistic,
    GetUserData,
    GetUserSkills,
    GetClanAmounts,
    GetClans,
    GetClanInfo,
    GetClanMembers,
    GetNewMatches,
    GetSlotsDict,
    GetItemsDict,
    GetMapsDict,
}

impl Endpoint {
    pub const ALL: [Endpoint; 16] = [
        Endpoint::GetMaxMatchId,
        Endpoint::GetPublicIdByNickname,
        Endpoint::GetNicknamesByPublicIds,
        Endpoint::MatchesCountByPublicId,
        Endpoint::GetMatchesIdByPublicId,
        Endpoint::GetMatchStatistic,
        Endpoint::GetUserData,
        Endpoint::GetUserSkills,
        Endpoint::GetClanAmounts,
        Endpoint::GetClans,
        Endpoint::GetClanInfo,
        Endpoint::GetClanMembers,
        Endpoint::GetNewMatches,
        Endpoint::GetSlotsDict,
        Endpoint::GetItemsDict,
        Endpoint::GetMapsDict,
    ];

    /// Method name used for dispatch and in proxy URLs.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetMaxMatchId => "getMaxMatchId",
            Self::GetPublicIdByNickname => "getPublicIdByNickname",
            Self::GetNicknamesByPublicIds => "getNicknamesByPublicIds",
            Self::MatchesCountByPublicId => "matchesCountByPublicId",
            Self::GetMatchesIdByPublicId => "getMatchesIdByPublicId",
            Self::GetMatchStatistic => "getMatchStatistic",
            Self::GetUserData => "getUserData",
            Self::GetUserSkills => "getUserSkills",
            Self::GetClanAmounts => "getClanAmounts",
            Self::GetClans => "getClans",
            Self::GetClanInfo => "getClanInfo",
            Self::GetClanMembers => "getClanMembers",
            Self::GetNewMatches => "getNewMatches",
            Self::GetSlotsDict => "getSlotsDict",
            Self::GetItemsDict => "getItemsDict",
            Self::GetMapsDict => "getMapsDict",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.name() == name)
    }

    /// Parameter names in positional order.
    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::GetMaxMatchId | Self::GetClanAmounts => &[],
            Self::GetPublicIdByNickname => NICKNAME,
            Self::GetNicknamesByPublicIds => PIDS,
            Self::MatchesCountByPublicId | Self::GetUserSkills => PID,
            Self::GetMatchesIdByPublicId => PID_PAGE,
            Self::GetMatchStatistic => ID_LANGUAGE,
            Self::GetUserData => PID_LANGUAGE,
            Self::GetClans => AMOUNT_OFFSET,
            Self::GetClanInfo | Self::GetClanMembers => ID,
            Self::GetNewMatches => NEW_MATCHES,
            Self::GetSlotsDict | Self::GetItemsDict | Self::GetMapsDict => LANGUAGE,
        }
    }

    /// Build the descriptor from loosely typed params.
    pub fn build(self, params: Option<&Value>) -> Result<QueryDescriptor> {
        match self {
            Self::GetMaxMatchId => get_max_match_id(),
            Self::GetPublicIdByNickname => get_public_id_by_nickname(decode(params)?.as_ref()),
            Self::GetNicknamesByPublicIds => get_nicknames_by_public_ids(decode(params)?.as_ref()),
            Self::MatchesCountByPublicId => matches_count_by_public_id(decode(params)?.as_ref()),
            Self::GetMatchesIdByPublicId => get_matches_id_by_public_id(decode(params)?.as_ref()),
            Self::GetMatchStatistic => get_match_statistic(decode(params)?.as_ref()),
            Self::GetUserData => get_user_data(decode(params)?.as_ref()),
            Self::GetUserSkills => get_user_skills(decode(params)?.as_ref()),
            Self::GetClanAmounts => get_clan_amounts(),
            Self::GetClans => get_clans(decode(params)?.as_ref()),
            Self::GetClanInfo => get_clan_info(decode(params)?.as_ref()),
            Self::GetClanMembers => get_clan_members(decode(params)?.as_ref()),
            Self::GetNewMatches => get_new_matches(decode(params)?.as_ref()),
            Self::GetSlotsDict => get_slots_dict(decode(params)?.as_ref()),
            Self::GetItemsDict => get_items_dict(decode(params)?.as_ref()),
            Self::GetMapsDict => get_maps_dict(decode(params)?.as_ref()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode<P: DeserializeOwned>(params: Option<&Value>) -> Result<Option<P>> {
    match params {
        None | Some(Value::Null) => Ok(None),
        Some(value) => P::deserialize(value)
            .map(Some)
            .map_err(|e| ApiError::validation(format!("invalid params: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(result: Result<QueryDescriptor>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_get_clans_with_params() {
        let descriptor = Endpoint::GetClans
            .build(Some(&json!({ "amount": 100, "offset": 50 })))
            .unwrap();
        assert_eq!(
            descriptor,
            QueryDescriptor::new("getclans")
                .with("amount", 100u64)
                .with("offset", 50u64)
        );
    }

    #[test]
    fn test_get_clans_defaults() {
        let expected = QueryDescriptor::new("getclans")
            .with("amount", 10u64)
            .with("offset", 0u64);
        assert_eq!(get_clans(Some(&PageParams::default())).unwrap(), expected);
        assert_eq!(get_clans(None).unwrap(), expected);
        assert_eq!(Endpoint::GetClans.build(Some(&json!({}))).unwrap(), expected);
    }

    #[test]
    fn test_single_pid_is_wrapped() {
        let descriptor = Endpoint::GetNicknamesByPublicIds
            .build(Some(&json!({ "pids": "42" })))
            .unwrap();
        assert_eq!(descriptor.path, "getnicknamesbypidarray");
        assert_eq!(descriptor.get("pids"), Some(&QueryValue::from("42")));
    }

    #[test]
    fn test_pids_joined_with_commas() {
        let descriptor = Endpoint::GetNicknamesByPublicIds
            .build(Some(&json!({ "pids": ["1606615321417388317", "15238791817735151910", 7] })))
            .unwrap();
        assert_eq!(
            descriptor.get("pids"),
            Some(&QueryValue::from("1606615321417388317,15238791817735151910,7"))
        );
    }

    #[test]
    fn test_pids_errors() {
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(Some(&json!({ "pids": [] })))),
            "should be received at least one pid"
        );
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(Some(&json!({})))),
            "no pids received"
        );
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(Some(&json!({ "pids": "" })))),
            "no pids received"
        );
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(Some(&json!({ "pids": 0 })))),
            "no pids received"
        );
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(None)),
            "no params received"
        );
        assert_eq!(
            message(Endpoint::GetNicknamesByPublicIds.build(Some(&json!({ "pids": ["12", "x1"] })))),
            "pid must be a number"
        );
    }

    #[test]
    fn test_identifiers_accept_digit_strings_and_numbers() {
        for pid in [json!("15238791817735151910"), json!(42)] {
            let descriptor = Endpoint::MatchesCountByPublicId
                .build(Some(&json!({ "pid": pid })))
                .unwrap();
            assert_eq!(descriptor.path, "getmatchescountbypid");
        }

        let descriptor = Endpoint::GetUserData
            .build(Some(&json!({ "pid": "15238791817735151910" })))
            .unwrap();
        assert_eq!(
            descriptor.get("pid"),
            Some(&QueryValue::from("15238791817735151910"))
        );
    }

    #[test]
    fn test_identifiers_reject_bad_input() {
        let build = |value: Value| message(Endpoint::GetClanInfo.build(Some(&value)));

        assert_eq!(build(json!({})), "no id received");
        assert_eq!(build(json!({ "id": null })), "no id received");
        assert_eq!(build(json!({ "id": "abc" })), "id must be a number");
        assert_eq!(build(json!({ "id": "12a" })), "id must be a number");
        assert_eq!(build(json!({ "id": "" })), "no id received");
        assert_eq!(build(json!({ "id": 0 })), "no id received");
        assert!(Endpoint::GetClanInfo.build(Some(&json!({ "id": "0" }))).is_ok());
        assert_eq!(build(json!({ "id": -5 })), "id is incorrect");
        assert_eq!(build(json!({ "id": 1.5 })), "id is incorrect");
        assert_eq!(message(Endpoint::GetClanInfo.build(None)), "no params received");
    }

    #[test]
    fn test_match_statistic_language() {
        let descriptor = Endpoint::GetMatchStatistic
            .build(Some(&json!({ "id": 3000000 })))
            .unwrap();
        assert_eq!(
            descriptor,
            QueryDescriptor::new("getmatchstatisticbyid")
                .with("matchid", 3000000u64)
                .with("language", "english")
        );

        let descriptor = Endpoint::GetMatchStatistic
            .build(Some(&json!({ "id": "3000000", "lang": "russian" })))
            .unwrap();
        assert_eq!(descriptor.get("language"), Some(&QueryValue::from("russian")));

        let descriptor = Endpoint::GetMatchStatistic
            .build(Some(&json!({ "id": "3000000", "language": "" })))
            .unwrap();
        assert_eq!(descriptor.get("language"), Some(&QueryValue::from("english")));
    }

    #[test]
    fn test_matches_defaults_and_order() {
        let descriptor = Endpoint::GetMatchesIdByPublicId
            .build(Some(&json!({ "pid": "1", "offset": 5 })))
            .unwrap();
        assert_eq!(
            descriptor,
            QueryDescriptor::new("getmatchesidbypublicid")
                .with("pid", "1")
                .with("matchAmount", 10u64)
                .with("offset", 5u64)
        );
        assert_eq!(descriptor.query_string(), "pid=1&matchAmount=10&offset=5");
    }

    #[test]
    fn test_nickname_required() {
        assert_eq!(
            message(Endpoint::GetPublicIdByNickname.build(Some(&json!({ "nickname": "" })))),
            "no nickname received"
        );
        assert_eq!(
            message(get_public_id_by_nickname(Some(&NicknameParams::default()))),
            "no nickname received"
        );

        let descriptor = get_public_id_by_nickname(Some(&NicknameParams {
            nickname: Some("vase ker".to_string()),
        }))
        .unwrap();
        assert_eq!(descriptor.query_string(), "nickname=vase%20ker");
    }

    #[test]
    fn test_new_matches_truncates_millisecond_timestamp() {
        let descriptor = Endpoint::GetNewMatches
            .build(Some(&json!({ "timestamp": 1451037600000u64 })))
            .unwrap();
        assert_eq!(
            descriptor,
            QueryDescriptor::new("getnewmatches")
                .with("timestamp", "1451037600")
                .with("limit", 50u64)
                .with("offset", 0u64)
        );

        let descriptor = Endpoint::GetNewMatches
            .build(Some(&json!({ "timestamp": 1451037600u64, "limit": 5 })))
            .unwrap();
        assert_eq!(descriptor.get("timestamp"), Some(&QueryValue::Number(1451037600)));
        assert_eq!(descriptor.get("limit"), Some(&QueryValue::Number(5)));
    }

    #[test]
    fn test_dictionaries_default_language() {
        for endpoint in [Endpoint::GetSlotsDict, Endpoint::GetItemsDict, Endpoint::GetMapsDict] {
            let descriptor = endpoint.build(None).unwrap();
            assert_eq!(descriptor.get("language"), Some(&QueryValue::from("english")));
        }
        let descriptor = get_maps_dict(Some(&LanguageParams {
            language: Some("russian".to_string()),
        }))
        .unwrap();
        assert_eq!(descriptor.query_string(), "language=russian");
    }

    #[test]
    fn test_parameterless_endpoints() {
        assert_eq!(get_max_match_id().unwrap(), QueryDescriptor::new("getmaxmatchid"));
        assert_eq!(get_clan_amounts().unwrap().query_string(), "");
    }

    #[test]
    fn test_endpoint_names_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.name()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_name("dropTables"), None);
    }

    #[test]
    fn test_endpoint_params_in_positional_order() {
        let names = |endpoint: Endpoint| -> Vec<&'static str> {
            endpoint.params().iter().map(|p| p.name).collect()
        };

        assert!(Endpoint::GetMaxMatchId.params().is_empty());
        assert!(Endpoint::GetClanAmounts.params().is_empty());
        assert_eq!(names(Endpoint::GetPublicIdByNickname), vec!["nickname"]);
        assert_eq!(names(Endpoint::GetUserSkills), vec!["pid"]);
        assert_eq!(
            names(Endpoint::GetMatchesIdByPublicId),
            vec!["pid", "matchAmount", "offset"]
        );
        assert_eq!(names(Endpoint::GetMatchStatistic), vec!["id", "language"]);
        assert_eq!(names(Endpoint::GetClans), vec!["amount", "offset"]);
        assert_eq!(
            names(Endpoint::GetNewMatches),
            vec!["timestamp", "limit", "offset"]
        );
        assert_eq!(names(Endpoint::GetMapsDict), vec!["language"]);

        let pids = Endpoint::GetNicknamesByPublicIds.params();
        assert_eq!(pids.len(), 1);
        assert!(pids[0].list);
        for endpoint in Endpoint::ALL {
            assert_eq!(
                endpoint.params().iter().filter(|p| p.list).count(),
                usize::from(endpoint == Endpoint::GetNicknamesByPublicIds)
            );
        }
    }

    #[test]
    fn test_malformed_params_are_validation_errors() {
        let err = Endpoint::GetClanInfo
            .build(Some(&json!({ "id": { "nested": true } })))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
