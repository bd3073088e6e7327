//! Route handlers: parse inputs, invoke the service/cache gateway, map domain
//! results onto HTTP per the status table (success/create 201, update 200,
//! delete 204, read 200, bad input 400, not found 404, conflict 409).

use crate::app::AppState;
use crate::error::{AdapterError, ApiError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use banner_core::store::BannerUpdate;
use banner_core::{Banner, BannerId, Content, FeatureId, Patch, TagId, Version};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateBannerRequest {
    pub content: serde_json::Value,
    pub feature_id: u32,
    pub tag_ids: Vec<u32>,
    pub is_active: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CreateBannerResponse {
    pub banner_id: u32,
}

/// Creates a banner.
#[utoipa::path(post, path = "/api/v1/banner", request_body = CreateBannerRequest, responses((status = 201, body = CreateBannerResponse)))]
pub async fn create_banner(
    State(state): State<AppState>,
    Json(request): Json<CreateBannerRequest>,
) -> Result<Response, Response> {
    let content = Content::new(request.content)
        .map_err(|_| AdapterError::BadRequest("content must be a JSON object".into()).into_response())?;

    let tag_ids = request.tag_ids.into_iter().map(TagId).collect();

    let id = state
        .service
        .create_banner(FeatureId(request.feature_id), tag_ids, content, request.is_active)
        .await
        .map_err(ApiError::from)
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(CreateBannerResponse { banner_id: id.0 })).into_response())
}

#[derive(Deserialize)]
pub struct BannerListQuery {
    pub feature_id: Option<u32>,
    pub tag_id: Option<u32>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Lists banners for administration (both active and inactive).
#[utoipa::path(get, path = "/api/v1/banner", responses((status = 200)))]
pub async fn get_banners(
    State(state): State<AppState>,
    Query(query): Query<BannerListQuery>,
) -> Result<Json<Vec<Banner>>, ApiError> {
    let banners = state
        .service
        .get_admin_banners(query.feature_id.map(FeatureId), query.tag_id.map(TagId), query.offset, query.limit)
        .await?;

    Ok(Json(banners))
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct PatchBannerRequest {
    pub content: Option<serde_json::Value>,
    pub feature_id: Option<u32>,
    pub tag_ids: Option<Vec<u32>>,
    pub is_active: Option<bool>,
}

/// Applies a partial update to a banner. Absent fields are left unchanged.
#[utoipa::path(patch, path = "/api/v1/banner/{id}", request_body = PatchBannerRequest, responses((status = 200)))]
pub async fn update_banner(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<PatchBannerRequest>,
) -> Result<StatusCode, Response> {
    let content = match request.content {
        Some(value) => Patch::Set(
            Content::new(value)
                .map_err(|_| AdapterError::BadRequest("content must be a JSON object".into()).into_response())?,
        ),
        None => Patch::Unset,
    };

    let update = BannerUpdate {
        id: BannerId(id),
        content,
        feature_id: request.feature_id.map(FeatureId).into(),
        tag_ids: request.tag_ids.map(|tags| tags.into_iter().map(TagId).collect()).into(),
        is_active: request.is_active.into(),
    };

    state.service.update_banner(update).await.map_err(ApiError::from).map_err(IntoResponse::into_response)?;

    Ok(StatusCode::OK)
}

/// Physically deletes a banner by id.
#[utoipa::path(delete, path = "/api/v1/banner/{id}", responses((status = 204)))]
pub async fn delete_banner(State(state): State<AppState>, Path(id): Path<u32>) -> Result<StatusCode, ApiError> {
    state.service.delete_banner(BannerId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct FilterQuery {
    pub feature_id: Option<u32>,
    pub tag_id: Option<u32>,
}

/// Logically deletes every banner matching the given feature/tag filter, then
/// enqueues a sweep (does not wait for it to run).
#[utoipa::path(delete, path = "/api/v1/filter_banner", responses((status = 204)))]
pub async fn delete_filtered_banner(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete_filtered_banner(query.feature_id.map(FeatureId), query.tag_id.map(TagId))
        .await?;

    if state.sweeper.trigger().is_err() {
        tracing::warn!("filtered delete succeeded but the sweeper is not running");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct UserBannerQuery {
    pub feature_id: u32,
    pub tag_id: u32,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub use_last_revision: bool,
}

/// Reads a banner's content the way an end user sees it, honoring the cache.
#[utoipa::path(get, path = "/api/v1/user_banner", responses((status = 200)))]
pub async fn get_user_banner(
    State(state): State<AppState>,
    Query(query): Query<UserBannerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content = state
        .service
        .get_user_banner(
            FeatureId(query.feature_id),
            TagId(query.tag_id),
            query.version.map(Version),
            query.use_last_revision,
        )
        .await?;

    Ok(Json(content.into_value()))
}

/// Mints a demo admin bearer token.
#[utoipa::path(get, path = "/api/v1/token/admin", responses((status = 200, body = String)))]
pub async fn get_admin_token(State(state): State<AppState>) -> String {
    state.token_validator.mint_admin_token()
}

/// Mints a demo user bearer token.
#[utoipa::path(get, path = "/api/v1/token/user", responses((status = 200, body = String)))]
pub async fn get_user_token(State(state): State<AppState>) -> String {
    state.token_validator.mint_user_token()
}
