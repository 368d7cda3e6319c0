use std::fmt::{Display, Formatter};
use thiserror::Error;
use warble_common::model::ModelValidationError;

/// Coarse classification of every failure an operation can report.
///
/// The HTTP edge maps these to status codes; the core never does.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Unauthorized,
    BadRequest,
    Internal,
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

/// Uniqueness constraints the store enforces.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Constraint {
    UserEmail,
    UserSlug,
    FriendshipPair,
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Constraint::UserEmail => "user email",
            Constraint::UserSlug => "user slug",
            Constraint::FriendshipPair => "friendship pair",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint on {0} violated")]
    Conflict(Constraint),
    #[error("An object in the store was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Store backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(error))
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Data(_) | StoreError::Backend(_) => ErrorKind::Internal,
        }
    }
}

/// Declares an operation's error enum together with its [`Classify`] impl.
///
/// Every enum gets a `Store` variant for failures of the store itself.
macro_rules! operation_error {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                #[error($($message:tt)*)]
                $variant:ident $(($($field:ty),*))? => $kind:ident,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, thiserror::Error)]
        pub enum $name {
            $(
                #[error($($message)*)]
                $variant $(($($field),*))?,
            )*
            #[error(transparent)]
            Store(#[from] $crate::error::StoreError),
        }

        impl $crate::error::Classify for $name {
            fn kind(&self) -> $crate::error::ErrorKind {
                match self {
                    $(
                        $name::$variant { .. } => $crate::error::ErrorKind::$kind,
                    )*
                    $name::Store(error) => $crate::error::Classify::kind(error),
                }
            }
        }
    };
}

pub(crate) use operation_error;
