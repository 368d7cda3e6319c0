use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn days(days: u32) -> Option<Self> {
        Self::new(Duration::days(i64::from(days)))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Serializes a [`UtcDateTime`](time::UtcDateTime) as milliseconds since the unix epoch.
///
/// Use with `#[serde(with = "crate::util::unix_millis")]`.
pub mod unix_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    const UNIX_EPOCH: UtcDateTime = utc_datetime!(1970-01-01 00:00);

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (*value - UNIX_EPOCH).whole_milliseconds() as i64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::milliseconds(millis))
    }
}
