use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    util::unix_millis,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::collections::BTreeSet;
use thiserror::Error;
use time::UtcDateTime;

pub const MEDIA_PATH_MAX_LEN: usize = 512;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A post as it is stored, including everything embedded in it.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Id<UserMarker>,
    pub content: String,
    pub media: Option<MediaPath>,
    #[serde(with = "unix_millis")]
    pub created_at: UtcDateTime,
    pub likes: BTreeSet<Id<UserMarker>>,
    pub shares: BTreeSet<Id<UserMarker>>,
    pub comments: Vec<Comment>,
    pub hashtags: BTreeSet<Hashtag>,
}

impl Post {
    #[must_use]
    pub fn is_liked_by(&self, user: Id<UserMarker>) -> bool {
        self.likes.contains(&user)
    }

    #[must_use]
    pub fn is_shared_by(&self, user: Id<UserMarker>) -> bool {
        self.shares.contains(&user)
    }

    #[must_use]
    pub fn comment(&self, id: Id<CommentMarker>) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == id)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub author: Id<UserMarker>,
    pub content: String,
    #[serde(with = "unix_millis")]
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content: String,
    pub media: Option<MediaPath>,
    pub hashtags: BTreeSet<Hashtag>,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub author: Id<UserMarker>,
    pub content: String,
    pub created_at: UtcDateTime,
}

/// Replacement content for an existing post. Likes, shares and comments are untouched.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostEdit {
    pub content: String,
    pub hashtags: BTreeSet<Hashtag>,
    pub media: MediaEdit,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub enum MediaEdit {
    #[default]
    Keep,
    Replace(MediaPath),
    Remove,
}

impl MediaEdit {
    /// Removal wins over a replacement uploaded in the same request.
    #[must_use]
    pub fn from_request(replacement: Option<MediaPath>, remove: bool) -> Self {
        match (remove, replacement) {
            (true, _) => MediaEdit::Remove,
            (false, Some(path)) => MediaEdit::Replace(path),
            (false, None) => MediaEdit::Keep,
        }
    }

    #[must_use]
    pub fn apply(&self, current: Option<MediaPath>) -> Option<MediaPath> {
        match self {
            MediaEdit::Keep => current,
            MediaEdit::Replace(path) => Some(path.clone()),
            MediaEdit::Remove => None,
        }
    }
}

/// One entry of a timeline. `reposter` is set when the post shows up because
/// someone other than its author reshared it.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct FeedItem {
    pub post: Post,
    pub poster: User,
    pub reposter: Option<User>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub poster: Option<User>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct PostStats {
    pub tweet_count: u64,
    pub likes_count: u64,
    pub shares_count: u64,
}

/// Reference to an uploaded media file, as handed out by the media storage.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct MediaPath(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The media path is invalid: {0}")]
pub struct InvalidMediaPathError(String);

impl MediaPath {
    pub fn new(path: String) -> Result<Self, InvalidMediaPathError> {
        if !path.trim().is_empty() && path.len() <= MEDIA_PATH_MAX_LEN {
            Ok(Self(path))
        } else {
            Err(InvalidMediaPathError(path))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for MediaPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        MediaPath::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"MediaPath"))
    }
}

/// Lowercase alphanumeric hashtag, stored without the leading `#`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Hashtag(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The hashtag is invalid: {0}")]
pub struct InvalidHashtagError(String);

impl Hashtag {
    /// Accepts any casing and an optional leading `#`.
    pub fn new(tag: &str) -> Result<Self, InvalidHashtagError> {
        let stripped = tag.strip_prefix('#').unwrap_or(tag);

        if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(stripped.to_ascii_lowercase()))
        } else {
            Err(InvalidHashtagError(tag.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Hashtag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Hashtag::new(&inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Hashtag"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{Hashtag, MediaEdit, MediaPath};

    #[test]
    fn hashtags_are_lowercased() {
        assert_eq!(Hashtag::new("#Hello").unwrap().get(), "hello");
        assert_eq!(Hashtag::new("rust2024").unwrap().get(), "rust2024");

        assert!(Hashtag::new("#").is_err());
        assert!(Hashtag::new("").is_err());
        assert!(Hashtag::new("two words").is_err());
    }

    #[test]
    fn media_edit_removal_wins() {
        let old = MediaPath::new("uploads/old.png".to_owned()).unwrap();
        let new = MediaPath::new("uploads/new.png".to_owned()).unwrap();

        assert_eq!(
            MediaEdit::from_request(Some(new.clone()), true).apply(Some(old.clone())),
            None
        );
        assert_eq!(
            MediaEdit::from_request(Some(new.clone()), false).apply(Some(old.clone())),
            Some(new)
        );
        assert_eq!(
            MediaEdit::from_request(None, false).apply(Some(old.clone())),
            Some(old)
        );
        assert!(MediaPath::new("  ".to_owned()).is_err());
    }
}
