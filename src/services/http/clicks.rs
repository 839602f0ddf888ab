use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    Json,
};
use serde::Deserialize;

use super::{call, AppState};
use crate::models::clicks;
use crate::services::{
    clicks::{ClickContext, ClickRequest},
    ServiceError,
};

#[derive(Debug, Default, Deserialize)]
pub struct RedirectParams {
    pub user_id: Option<String>,
}

fn click_context(headers: &HeaderMap) -> ClickContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    ClickContext {
        ip_address,
        user_agent,
    }
}

pub async fn track_click(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(click): Json<clicks::NewClick>,
) -> Result<(StatusCode, Json<clicks::TrackedClick>), ServiceError> {
    let context = click_context(&headers);
    let tracked = call(&state.channels.clicks, "ClickService", |response| {
        ClickRequest::TrackClick {
            click,
            context,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(tracked)))
}

pub async fn get_click(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<clicks::Click>, ServiceError> {
    let click = call(&state.channels.clicks, "ClickService", |response| {
        ClickRequest::GetClick { token, response }
    })
    .await?;

    Ok(Json(click))
}

pub async fn redirect_to_merchant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<RedirectParams>,
    headers: HeaderMap,
) -> Result<Redirect, ServiceError> {
    let context = click_context(&headers);
    let tracked = call(&state.channels.clicks, "ClickService", |response| {
        ClickRequest::TrackMerchantClick {
            slug,
            user_id: params.user_id,
            context,
            response,
        }
    })
    .await?;

    Ok(Redirect::temporary(&tracked.redirect_url))
}
