use crate::server::ServerRouter;
use serde::Deserialize;
use warble_core::store::Page;

mod auth;
mod feed;
mod friendships;
mod me;
mod posts;
mod users;

pub const DEFAULT_PAGE_AMOUNT: usize = 20;
pub const MAX_PAGE_AMOUNT: usize = 100;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(auth::routes())
        .merge(feed::routes())
        .merge(friendships::routes())
        .merge(me::routes())
        .merge(posts::routes())
        .merge(users::routes())
}

/// `?start=&amount=`, with the amount defaulted and capped.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct PageQuery {
    #[serde(default)]
    start: usize,
    amount: Option<usize>,
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        let amount = query
            .amount
            .unwrap_or(DEFAULT_PAGE_AMOUNT)
            .min(MAX_PAGE_AMOUNT);

        Page::new(query.start, amount)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct SearchQuery {
    q: String,
}
