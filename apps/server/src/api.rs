use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use survarium_api::{CallOptions, Endpoint};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::Config,
    error::{ServerError, ServerResult},
    main_lib::AppState,
};

const API_PREFIX: &str = "/v1";

pub async fn healthz() -> &'static str {
    "ok"
}

/// Advertise the API base.
async fn root(headers: HeaderMap) -> Json<Value> {
    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header_value("x-forwarded-proto").unwrap_or("http");
    let host = header_value(header::HOST.as_str()).unwrap_or("localhost");
    Json(json!({ "api": format!("{}://{}{}", scheme, host, API_PREFIX) }))
}

/// Every command with a URL template.
async fn index() -> Json<Value> {
    let commands: Map<String, Value> = Endpoint::ALL
        .iter()
        .map(|endpoint| {
            (
                endpoint.name().to_string(),
                Value::String(format!("{}/cmd/{}/?param1=&param2=", API_PREFIX, endpoint.name())),
            )
        })
        .collect();
    Json(Value::Object(commands))
}

/// Map query values, in order, onto the endpoint's parameter names.
///
/// Empty values leave their parameter unset. List parameters are split on
/// commas.
pub fn positional_params(endpoint: Endpoint, pairs: Vec<(String, String)>) -> Value {
    let mut params = Map::new();
    for (param, (_, value)) in endpoint.params().iter().zip(pairs) {
        if value.is_empty() {
            continue;
        }
        let value = if param.list {
            Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| Value::String(v.to_string()))
                    .collect(),
            )
        } else {
            Value::String(value)
        };
        params.insert(param.name.to_string(), value);
    }
    Value::Object(params)
}

async fn cmd(
    State(state): State<Arc<AppState>>,
    Path(cmd): Path<String>,
    RawQuery(query): RawQuery,
) -> ServerResult<Json<Value>> {
    let endpoint = Endpoint::from_name(&cmd).ok_or(ServerError::UnknownMethod(cmd))?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.as_deref().unwrap_or(""))
        .map_err(|e| ServerError::BadRequest(format!("invalid query: {}", e)))?;

    let params = positional_params(endpoint, pairs);
    tracing::debug!("{} {}", endpoint, params);

    let result = state
        .client
        .call(endpoint.name(), Some(params), CallOptions::default())
        .await
        .map_err(|e| ServerError::api(e, state.detailed_errors))?;
    Ok(Json(result))
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_allow.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins = config
            .cors_allow
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins)
    };

    let v1 = Router::new()
        .route("/", get(index))
        .route("/cmd/{cmd}", get(cmd))
        .route("/cmd/{cmd}/", get(cmd));

    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .nest(API_PREFIX, v1)
        .nest_service("/public", ServeDir::new(&config.static_dir))
        .with_state(state)
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn maps_values_by_position() {
        let params = positional_params(
            Endpoint::GetMatchesIdByPublicId,
            pairs(&[("a", "42"), ("b", "5"), ("c", "10"), ("extra", "x")]),
        );
        assert_eq!(
            params,
            json!({ "pid": "42", "matchAmount": "5", "offset": "10" })
        );
    }

    #[test]
    fn skips_empty_values() {
        let params = positional_params(Endpoint::GetClans, pairs(&[("param1", ""), ("param2", "")]));
        assert_eq!(params, json!({}));
    }

    #[test]
    fn splits_list_values() {
        let params = positional_params(
            Endpoint::GetNicknamesByPublicIds,
            pairs(&[("pids", "1606615321417388317, 15238791817735151910")]),
        );
        assert_eq!(
            params,
            json!({ "pids": ["1606615321417388317", "15238791817735151910"] })
        );
    }
}
