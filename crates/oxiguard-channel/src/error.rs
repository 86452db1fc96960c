//! `ChannelError` — the one failure shape channel operations return.
//!
//! Store-level errors never leave the channel manager unchanged; they are
//! wrapped here with the channel name and their `ErrorKind`, keeping the
//! original error as `source`.

use std::error::Error as StdError;

use oxiguard_core::{ErrorKind, PermissionParseError};
use thiserror::Error;

use crate::blacklist::BlacklistError;
use crate::history::HistoryError;
use crate::links::LinkError;
use crate::permissions::PermissionError;
use crate::settings::SettingError;

/// A failed channel operation.
#[derive(Debug, Error)]
#[error("channel operation failed on #{channel} ({kind}): {detail}")]
pub struct ChannelError {
    pub channel: String,
    pub kind: ErrorKind,
    pub detail: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ChannelError {
    pub fn new(channel: impl Into<String>, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    /// Wrap `source`, using its message as the detail.
    pub fn wrap<E>(channel: impl Into<String>, kind: ErrorKind, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            channel: channel.into(),
            kind,
            detail: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Store errors that can be lifted into a [`ChannelError`].
pub(crate) trait IntoChannelError: StdError + Send + Sync + Sized + 'static {
    fn error_kind(&self) -> ErrorKind;

    fn in_channel(self, channel: &str) -> ChannelError {
        let kind = self.error_kind();
        ChannelError::wrap(channel, kind, self)
    }
}

macro_rules! store_error {
    ($($ty:ty),* $(,)?) => {
        $(impl IntoChannelError for $ty {
            fn error_kind(&self) -> ErrorKind {
                self.kind()
            }
        })*
    };
}

store_error!(PermissionError, HistoryError, BlacklistError, SettingError, LinkError);

impl IntoChannelError for PermissionParseError {
    fn error_kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}
