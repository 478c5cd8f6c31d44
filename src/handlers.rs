use crate::{
    errors::AppError,
    models::{Meme, MemeFilter, Page, SortOrder, Timeframe},
    service::{NewMeme, Requester},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 9;

/// Pagination comes in as raw query strings; anything that is not a positive
/// integer is an invalid query.
fn parse_page(page: Option<&str>, limit: Option<&str>) -> Result<Page, AppError> {
    let number = match page {
        Some(p) => p.parse::<usize>().ok().filter(|n| *n >= 1).ok_or(AppError::InvalidQuery)?,
        None => 1,
    };
    let size = match limit {
        Some(l) => l.parse::<usize>().ok().filter(|n| *n >= 1).ok_or(AppError::InvalidQuery)?,
        None => DEFAULT_PAGE_SIZE,
    };
    Ok(Page { number, size })
}

/// Path ids that are not well formed cannot name any meme.
fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound)
}

/// Handler for GET /api, the status banner.
pub async fn api_status() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to MemeStream API",
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
        "cors": "enabled",
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Handler for GET /api/memes. Responds with a bare array.
pub async fn get_memes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Meme>>, AppError> {
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;
    let sort = SortOrder::parse(query.sort.as_deref());
    let filter = MemeFilter {
        category: query.category,
        tag: query.tag,
    };

    let memes = state.service.list_memes(&filter, sort, page).await?;
    tracing::debug!(count = memes.len(), "Listed memes");
    Ok(Json(memes))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemeRequest {
    pub image_data: Option<String>,
    pub caption: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub user_id: Option<String>,
}

/// Handler for POST /api/memes.
pub async fn create_meme(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meme = state
        .service
        .create_meme(NewMeme {
            image_data: body.image_data.unwrap_or_default(),
            caption: body.caption.unwrap_or_default(),
            category: body.category.unwrap_or_default(),
            tags: body.tags.unwrap_or_default(),
            owner_id: body.user_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Meme created successfully",
            "meme": meme,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub timeframe: Option<String>,
}

/// Handler for GET /api/trending. Responds with a bare array.
pub async fn get_trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<Meme>>, AppError> {
    let timeframe = Timeframe::parse(query.timeframe.as_deref());
    let memes = state.service.trending_memes(timeframe).await?;
    Ok(Json(memes))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: Option<String>,
}

/// Handler for POST /api/memes/{id}/like.
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<LikeRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let user_id = body.and_then(|Json(b)| b.user_id).unwrap_or_default();

    let outcome = state.service.toggle_like(id, &user_id).await?;
    Ok(Json(json!({
        "success": true,
        "liked": outcome.liked,
        "likes": outcome.likes,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub user_id: Option<String>,
    pub reason: Option<String>,
}

/// Handler for POST /api/memes/{id}/report.
pub async fn report_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ReportRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let (user_id, reason) = match body {
        Some(Json(b)) => (b.user_id.unwrap_or_default(), b.reason),
        None => (String::new(), None),
    };

    state.service.report_meme(id, &user_id, reason).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Meme reported successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub user_id: Option<String>,
}

/// Handler for DELETE /api/memes/{id}. The requester's id rides in the body;
/// a missing id yields an unauthorized requester, not a validation error.
pub async fn delete_meme(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<DeleteRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let requester = Requester::new(body.and_then(|Json(b)| b.user_id).unwrap_or_default());

    state.service.delete_meme(id, &requester).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Meme deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub image_data: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Handler for POST /api/generate-caption.
pub async fn generate_caption(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CaptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caption = state
        .service
        .generate_caption(
            body.image_data.as_deref().unwrap_or_default(),
            &body.tags.unwrap_or_default(),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "caption": caption,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let page = parse_page(None, None).expect("defaults");
        assert_eq!(page.number, 1);
        assert_eq!(page.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn pagination_parses_positive_integers() {
        let page = parse_page(Some("2"), Some("3")).expect("valid");
        assert_eq!(page.number, 2);
        assert_eq!(page.size, 3);
    }

    #[test]
    fn pagination_rejects_zero_and_garbage() {
        assert!(matches!(parse_page(Some("0"), None), Err(AppError::InvalidQuery)));
        assert!(matches!(parse_page(None, Some("0")), Err(AppError::InvalidQuery)));
        assert!(matches!(parse_page(Some("-1"), None), Err(AppError::InvalidQuery)));
        assert!(matches!(parse_page(Some("abc"), None), Err(AppError::InvalidQuery)));
    }

    #[test]
    fn malformed_ids_read_as_not_found() {
        assert!(matches!(parse_id("not-a-uuid"), Err(AppError::NotFound)));
        assert!(parse_id("0191b2f8-6a01-7b7e-9a6e-3f1c40b7a001").is_ok());
    }
}
