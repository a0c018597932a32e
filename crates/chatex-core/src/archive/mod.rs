//! Chat archive: the message source an export run reads from.
//!
//! An archive is a JSON document listing chats and their messages. Media
//! entries carry a URL that [`HttpMedia`] can fetch. Iterating a chat with a
//! [`FetchMode`] yields report rows for every message and a [`MediaMessage`]
//! for every message with media.

mod fetch_mode;

pub use fetch_mode::{parse_start_date, FetchMode, DEFAULT_LATEST_LIMIT};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::ArchiveError;
use crate::media::{MediaAttributes, MediaFetch, MediaMessage};
use crate::transfer::{CurlOptions, HttpMedia, UnavailableMedia};

/// Default number of chats listed by [`ChatArchive::dialogs`].
pub const DEFAULT_DIALOG_LIMIT: usize = 20;

/// Media entry of an archived message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMedia {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    pub id: i64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sender_id: Option<i64>,
    #[serde(default)]
    pub reply_to: Option<i64>,
    #[serde(default)]
    pub media: Option<ArchivedMedia>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<ArchivedMessage>,
}

/// One row of the HTML report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub text: String,
    pub sender_id: Option<i64>,
    pub reply_to: Option<i64>,
}

/// How the user picked a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSelector {
    /// 1-based position in the [`ChatArchive::dialogs`] listing.
    Index(usize),
    Id(i64),
}

/// Result of iterating one chat.
#[derive(Debug, Default)]
pub struct FetchedMessages {
    /// All messages, in iteration order.
    pub records: Vec<MessageRecord>,
    /// Messages with media, in iteration (discovery) order.
    pub media: Vec<MediaMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatArchive {
    pub chats: Vec<Chat>,
}

impl ChatArchive {
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let data = fs::read_to_string(path).map_err(|source| ArchiveError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let archive = Self::from_json(&data)?;
        tracing::debug!(path = %path.display(), chats = archive.chats.len(), "loaded chat archive");
        Ok(archive)
    }

    /// Parses an archive. Message ids must be unique within each chat.
    pub fn from_json(data: &str) -> Result<Self, ArchiveError> {
        let archive: Self = serde_json::from_str(data)?;
        for chat in &archive.chats {
            chat.check_unique_ids()?;
        }
        Ok(archive)
    }

    /// First `limit` chats in archive order.
    pub fn dialogs(&self, limit: usize) -> &[Chat] {
        &self.chats[..limit.min(self.chats.len())]
    }

    pub fn find_chat(&self, selector: ChatSelector) -> Result<&Chat, ArchiveError> {
        let found = match selector {
            ChatSelector::Index(n) => n.checked_sub(1).and_then(|i| self.chats.get(i)),
            ChatSelector::Id(id) => self.chats.iter().find(|c| c.id == id),
        };
        found.ok_or_else(|| {
            ArchiveError::ChatNotFound(match selector {
                ChatSelector::Index(n) => format!("#{}", n),
                ChatSelector::Id(id) => format!("id {}", id),
            })
        })
    }
}

impl Chat {
    fn check_unique_ids(&self) -> Result<(), ArchiveError> {
        let mut seen = HashSet::with_capacity(self.messages.len());
        match self.messages.iter().find(|m| !seen.insert(m.id)) {
            Some(dup) => Err(ArchiveError::DuplicateMessageId {
                chat_id: self.id,
                message_id: dup.id,
            }),
            None => Ok(()),
        }
    }

    /// Messages selected by `mode`, in its iteration order.
    pub fn iter_messages(&self, mode: FetchMode) -> Vec<&ArchivedMessage> {
        let mut selected: Vec<&ArchivedMessage> = self
            .messages
            .iter()
            .filter(|m| match mode {
                FetchMode::Earliest | FetchMode::Latest(_) => true,
                FetchMode::FromDate(since) => m.date >= since,
                FetchMode::FromMessageId(min_id) => m.id > min_id,
            })
            .collect();

        if mode.is_ascending() {
            selected.sort_by_key(|m| m.id);
        } else {
            selected.sort_by_key(|m| std::cmp::Reverse(m.id));
        }
        if let FetchMode::Latest(limit) = mode {
            selected.truncate(limit);
        }
        selected
    }

    /// Report rows and media handles for the messages selected by `mode`.
    pub fn fetch(&self, mode: FetchMode, options: &CurlOptions) -> FetchedMessages {
        let mut fetched = FetchedMessages::default();
        for msg in self.iter_messages(mode) {
            fetched.records.push(MessageRecord {
                id: msg.id,
                date: msg.date,
                text: msg.text.clone().unwrap_or_default(),
                sender_id: msg.sender_id,
                reply_to: msg.reply_to,
            });
            if let Some(media) = msg.media.as_ref() {
                fetched.media.push(MediaMessage {
                    id: msg.id,
                    attributes: MediaAttributes {
                        file_name: media.file_name.clone(),
                        ext: media.ext.clone(),
                        size: media.size,
                    },
                    handle: media_handle(msg.id, media, options),
                });
            }
        }
        tracing::debug!(
            chat_id = self.id,
            messages = fetched.records.len(),
            media = fetched.media.len(),
            "fetched chat messages"
        );
        fetched
    }
}

/// Fetch handle for a media entry; unresolvable sources become failing handles.
fn media_handle(id: i64, media: &ArchivedMedia, options: &CurlOptions) -> Arc<dyn MediaFetch> {
    let Some(raw) = media.url.as_deref().filter(|u| !u.trim().is_empty()) else {
        return Arc::new(UnavailableMedia::new("media has no source url"));
    };
    match url::Url::parse(raw.trim()) {
        Ok(u) if matches!(u.scheme(), "http" | "https" | "file") => {
            Arc::new(HttpMedia::new(u.as_str(), options.clone()))
        }
        Ok(u) => {
            tracing::debug!(job_id = id, scheme = u.scheme(), "unsupported media url scheme");
            Arc::new(UnavailableMedia::new(format!(
                "unsupported media url scheme: {}",
                u.scheme()
            )))
        }
        Err(e) => Arc::new(UnavailableMedia::new(format!("invalid media url: {}", e))),
    }
}
