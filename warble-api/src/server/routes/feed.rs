use crate::server::{
    CoreError, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    query::Query,
    routes::PageQuery,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use warble_common::model::post::FeedItem;
use warble_core::Engine;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

async fn get_feed(
    FeedPath(): FeedPath,
    State(engine): State<Engine>,
    viewer: AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FeedItem>>> {
    let feed = engine
        .feed(viewer.user_id(), page.into())
        .await
        .map_err(CoreError::from)?;

    Ok(Json(feed))
}
