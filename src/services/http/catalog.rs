use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{call, AppState};
use crate::models::{merchants, offers};
use crate::services::{catalog::CatalogRequest, ServiceError};

#[derive(Debug, Default, Deserialize)]
pub struct MerchantFilter {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferFilter {
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub live_only: bool,
}

pub async fn create_merchant(
    State(state): State<AppState>,
    Json(merchant): Json<merchants::NewMerchant>,
) -> Result<(StatusCode, Json<merchants::Merchant>), ServiceError> {
    let merchant = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::CreateMerchant { merchant, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(merchant)))
}

pub async fn get_merchant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<merchants::Merchant>, ServiceError> {
    let merchant = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::GetMerchant { id, response }
    })
    .await?;

    Ok(Json(merchant))
}

pub async fn list_merchants(
    State(state): State<AppState>,
    Query(filter): Query<MerchantFilter>,
) -> Result<Json<Vec<merchants::Merchant>>, ServiceError> {
    let merchants = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::ListMerchants {
            active_only: filter.active_only,
            response,
        }
    })
    .await?;

    Ok(Json(merchants))
}

pub async fn update_merchant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<merchants::MerchantUpdate>,
) -> Result<Json<merchants::Merchant>, ServiceError> {
    let merchant = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::UpdateMerchant {
            id,
            update,
            response,
        }
    })
    .await?;

    Ok(Json(merchant))
}

pub async fn create_offer(
    State(state): State<AppState>,
    Path(merchant_id): Path<String>,
    Json(offer): Json<offers::NewOffer>,
) -> Result<(StatusCode, Json<offers::Offer>), ServiceError> {
    let offer = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::CreateOffer {
            merchant_id,
            offer,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(offer)))
}

pub async fn list_merchant_offers(
    State(state): State<AppState>,
    Path(merchant_id): Path<String>,
    Query(filter): Query<OfferFilter>,
) -> Result<Json<Vec<offers::Offer>>, ServiceError> {
    let offers = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::ListOffers {
            merchant_id: Some(merchant_id),
            live_only: filter.live_only,
            response,
        }
    })
    .await?;

    Ok(Json(offers))
}

pub async fn list_offers(
    State(state): State<AppState>,
    Query(filter): Query<OfferFilter>,
) -> Result<Json<Vec<offers::Offer>>, ServiceError> {
    let offers = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::ListOffers {
            merchant_id: filter.merchant_id,
            live_only: filter.live_only,
            response,
        }
    })
    .await?;

    Ok(Json(offers))
}

pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<offers::Offer>, ServiceError> {
    let offer = call(&state.channels.catalog, "CatalogService", |response| {
        CatalogRequest::GetOffer { id, response }
    })
    .await?;

    Ok(Json(offer))
}
