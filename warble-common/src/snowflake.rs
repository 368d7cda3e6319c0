//! Snowflake ids: 42 bits of milliseconds since an [`Epoch`], then a 5 bit
//! worker id, a 5 bit process id and a 12 bit increment.
//!
//! Ids minted by one generator strictly increase, which is what lets the
//! stores use them as a tie breaker for equal timestamps.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

const INCREMENT_BITS: u32 = 12;
const PROCESS_ID_BITS: u32 = 5;
const WORKER_ID_BITS: u32 = 5;
const TIMESTAMP_BITS: u32 = 42;

const PROCESS_ID_SHIFT: u32 = INCREMENT_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

const INCREMENT_MAX: u16 = (1 << INCREMENT_BITS) - 1;
const TIMESTAMP_MAX: u64 = (1 << TIMESTAMP_BITS) - 1;

const fn field(snowflake: u64, shift: u32, bits: u32) -> u64 {
    (snowflake >> shift) & ((1 << bits) - 1)
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("{name} must be at most {max}, got {value}")]
pub struct IdPartOutOfRangeError {
    name: &'static str,
    value: u8,
    max: u8,
}

/// A small id that distinguishes concurrently running generators.
macro_rules! generator_id {
    ($name:ident, $bits:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            pub const MAX: u8 = (1 << $bits) - 1;

            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (id <= Self::MAX).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = IdPartOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(IdPartOutOfRangeError {
                    name: stringify!($name),
                    value,
                    max: Self::MAX,
                })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    D::Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

generator_id!(WorkerId, WORKER_ID_BITS);
generator_id!(ProcessId, PROCESS_ID_BITS);

#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    fn compose(millis: u64, worker_id: WorkerId, process_id: ProcessId, increment: u16) -> Self {
        Self::new(
            (millis << TIMESTAMP_SHIFT)
                | (u64::from(worker_id.get()) << WORKER_ID_SHIFT)
                | (u64::from(process_id.get()) << PROCESS_ID_SHIFT)
                | u64::from(increment),
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId(field(self.0, WORKER_ID_SHIFT, WORKER_ID_BITS) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn process_id(self) -> ProcessId {
        ProcessId(field(self.0, PROCESS_ID_SHIFT, PROCESS_ID_BITS) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn increment(self) -> u16 {
        field(self.0, 0, INCREMENT_BITS) as u16
    }

    /// The millisecond the id was minted in.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = field(self.0, TIMESTAMP_SHIFT, TIMESTAMP_BITS);
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis.cast_signed())
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Mints ids for one worker/process pair.
///
/// Should the clock step backwards, or more than 4096 ids be requested within
/// one millisecond, the generator keeps counting on its last timestamp and
/// borrows from the following milliseconds.
#[derive_where(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last: Option<(u64, u16)>,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch: Epoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last: None,
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake<SnowflakeEpoch> {
        // Times outside the representable range are clamped to it.
        let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        let millis = u64::try_from(millis.max(0)).map_or(TIMESTAMP_MAX, |m| m.min(TIMESTAMP_MAX));

        let (millis, increment) = match self.last {
            Some((last, increment)) if millis <= last => {
                if increment < INCREMENT_MAX {
                    (last, increment + 1)
                } else {
                    ((last + 1).min(TIMESTAMP_MAX), 0)
                }
            }
            _ => (millis, 0),
        };
        self.last = Some((millis, increment));

        Snowflake::compose(millis, self.worker_id, self.process_id, increment)
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch> {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::utc_datetime;

    struct TestEpoch;
    impl Epoch for TestEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-01-01 00:00);
    }

    fn generator() -> SnowflakeGenerator<TestEpoch> {
        SnowflakeGenerator::new(WorkerId::new(21).unwrap(), ProcessId::new(17).unwrap())
    }

    #[test]
    fn generator_ids_are_bounded() {
        assert_eq!(WorkerId::MAX, 31);
        assert!(WorkerId::new(31).is_some());
        assert!(WorkerId::new(32).is_none());
        assert!(ProcessId::try_from(u8::MAX).is_err());

        assert_eq!(serde_json::from_str::<WorkerId>("7").unwrap().get(), 7);
        assert!(serde_json::from_str::<ProcessId>("40").is_err());
    }

    #[test]
    fn parts_decode() {
        let time = utc_datetime!(2025-10-24 10:30);
        let snowflake = generator().generate_at(time);

        assert_eq!(snowflake.created_at(), time);
        assert_eq!(snowflake.worker_id().get(), 21);
        assert_eq!(snowflake.process_id().get(), 17);
        assert_eq!(snowflake.increment(), 0);
    }

    #[test]
    fn increment_resets_each_millisecond() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator = generator();

        let first = generator.generate_at(time);
        let second = generator.generate_at(time);
        let third = generator.generate_at(time + Duration::milliseconds(1));

        assert_eq!(second.increment(), 1);
        assert_eq!(third.increment(), 0);
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn backwards_clock_keeps_ids_increasing() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator = generator();

        let first = generator.generate_at(time);
        let second = generator.generate_at(time - Duration::seconds(5));

        assert!(first < second);
        assert_eq!(second.created_at(), time);
    }

    #[test]
    fn exhausted_millisecond_borrows_the_next() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator = generator();

        let mut last = generator.generate_at(time);
        for _ in 0..INCREMENT_MAX {
            let next = generator.generate_at(time);
            assert!(last < next);
            last = next;
        }
        assert_eq!(last.increment(), INCREMENT_MAX);

        let borrowed = generator.generate_at(time);
        assert!(last < borrowed);
        assert_eq!(borrowed.created_at(), time + Duration::milliseconds(1));
    }

    #[test]
    fn time_before_epoch_clamps() {
        let snowflake = generator().generate_at(TestEpoch::EPOCH_TIME - Duration::days(1));

        assert_eq!(snowflake.created_at(), TestEpoch::EPOCH_TIME);
    }
}
