use crate::{
    model::{Id, post::PostMarker, user::User},
    util::unix_millis,
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Notification kept on the mentioned user's record. `mentioner` is a
/// snapshot taken when the mention was created and is not kept in sync.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Mention {
    pub mentioner: User,
    pub post: Id<PostMarker>,
    #[serde(with = "unix_millis")]
    pub mentioned_at: UtcDateTime,
    pub seen: bool,
}

impl Mention {
    #[must_use]
    pub fn new(mentioner: User, post: Id<PostMarker>, mentioned_at: UtcDateTime) -> Self {
        Self {
            mentioner,
            post,
            mentioned_at,
            seen: false,
        }
    }
}
