//! The `/api/<ver>/<kind>[/<id>]` and `/api/<ver>/watch/<kind>` handlers.
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use orc_core::codec::{self, KnownKind};
use orc_core::{Error, ListParams, WatchParams};
use serde::Deserialize;

use crate::error::ApiError;
use crate::format::{encoded_response, negotiate};
use crate::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct SelectorQuery {
    labels: Option<String>,
    fields: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    labels: Option<String>,
    fields: Option<String>,
    #[serde(rename = "resourceVersion")]
    resource_version: Option<u64>,
}

fn resolve(ver: &str, kind: &str, format: orc_core::codec::Format) -> Result<KnownKind, ApiError> {
    if ver != codec::API_VERSION {
        return Err(ApiError::new(
            Error::Invalid {
                kind: "ApiVersion",
                id: ver.to_string(),
                message: format!("unsupported api version {ver:?}"),
            },
            format,
        ));
    }
    KnownKind::from_plural(kind).map_err(|_| {
        ApiError::new(
            Error::NotFound {
                kind: "Kind",
                id: kind.to_string(),
            },
            format,
        )
    })
}

fn list_params(q: SelectorQuery, format: orc_core::codec::Format) -> Result<ListParams, ApiError> {
    let mut params = ListParams::default();
    if let Some(labels) = q.labels {
        params = params.labels(&labels).map_err(|e| invalid_query(e, format))?;
    }
    if let Some(fields) = q.fields {
        params = params.fields(&fields).map_err(|e| invalid_query(e, format))?;
    }
    Ok(params)
}

fn invalid_query(err: impl std::fmt::Display, format: orc_core::codec::Format) -> ApiError {
    ApiError::new(
        Error::Invalid {
            kind: "Query",
            id: String::new(),
            message: err.to_string(),
        },
        format,
    )
}

pub async fn list(
    State(state): State<ApiState>,
    Path((ver, kind)): Path<(String, String)>,
    Query(q): Query<SelectorQuery>,
    headers: HeaderMap,
) -> Response {
    let format = negotiate(&headers);
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        let params = list_params(q, format)?;
        let (items, resource_version) = crate::kinds::list(&state.registries, kind, &params)
            .await
            .map_err(|e| ApiError::new(e, format))?;
        Ok::<_, ApiError>(serde_json::json!({
            "items": items,
            "resourceVersion": resource_version.map(|v| v.to_string()),
        }))
    }
    .await;
    match outcome {
        Ok(body) => encoded_response(StatusCode::OK, format, &body),
        Err(err) => err.into_response(),
    }
}

pub async fn get_one(
    State(state): State<ApiState>,
    Path((ver, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let format = negotiate(&headers);
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        crate::kinds::get(&state.registries, kind, &id).await.map_err(|e| ApiError::new(e, format))
    }
    .await;
    match outcome {
        Ok(body) => encoded_response(StatusCode::OK, format, &body),
        Err(err) => err.into_response(),
    }
}

pub async fn create(
    State(state): State<ApiState>,
    Path((ver, kind)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = negotiate(&headers);
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        crate::kinds::create(&state.registries, kind, format, &body)
            .await
            .map_err(|e| ApiError::new(e, format))
    }
    .await;
    match outcome {
        Ok(body) => encoded_response(StatusCode::CREATED, format, &body),
        Err(err) => err.into_response(),
    }
}

pub async fn update(
    State(state): State<ApiState>,
    Path((ver, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let format = negotiate(&headers);
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        crate::kinds::update(&state.registries, kind, format, &id, &body)
            .await
            .map_err(|e| ApiError::new(e, format))
    }
    .await;
    match outcome {
        Ok(body) => encoded_response(StatusCode::OK, format, &body),
        Err(err) => err.into_response(),
    }
}

pub async fn delete(
    State(state): State<ApiState>,
    Path((ver, kind, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let format = negotiate(&headers);
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        crate::kinds::delete(&state.registries, kind, &id).await.map_err(|e| ApiError::new(e, format))
    }
    .await;
    match outcome {
        Ok(body) => encoded_response(StatusCode::OK, format, &body),
        Err(err) => err.into_response(),
    }
}

pub async fn watch(
    State(state): State<ApiState>,
    Path((ver, kind)): Path<(String, String)>,
    Query(q): Query<WatchQuery>,
    headers: HeaderMap,
) -> Response {
    let format = negotiate(&headers);
    let selector = SelectorQuery {
        labels: q.labels,
        fields: q.fields,
    };
    let outcome = async {
        let kind = resolve(&ver, &kind, format)?;
        let list = list_params(selector, format)?;
        let params = WatchParams {
            list,
            since_version: q.resource_version,
        };
        crate::kinds::watch(&state.watches, kind, format, &params)
            .await
            .map_err(|e| ApiError::new(e, format))
    }
    .await;
    match outcome {
        Ok(stream) => ([(axum::http::header::CONTENT_TYPE, format.content_type())], Body::from_stream(stream)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn healthz(State(state): State<ApiState>) -> Response {
    match state.registries.minions.list(&ListParams::default()).await {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    }
}
