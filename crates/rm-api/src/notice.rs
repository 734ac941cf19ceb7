//! User-facing notices carried across a redirect in the `aviso` query key.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NotFound,
    DuplicateCode,
    Invalid,
    Created,
    Reported,
    Updated,
}

impl Notice {
    const ALL: [Notice; 6] = [
        Notice::NotFound,
        Notice::DuplicateCode,
        Notice::Invalid,
        Notice::Created,
        Notice::Reported,
        Notice::Updated,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Notice::NotFound => "not-found",
            Notice::DuplicateCode => "duplicate-code",
            Notice::Invalid => "invalid",
            Notice::Created => "created",
            Notice::Reported => "reported",
            Notice::Updated => "updated",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.key() == key)
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::NotFound => "Machine not found",
            Notice::DuplicateCode => "That machine code is already in use",
            Notice::Invalid => "Some fields were missing or too long",
            Notice::Created => "Machine and QR code created",
            Notice::Reported => "Fault reported",
            Notice::Updated => "Fault updated",
        }
    }

    /// `path?aviso=key`
    pub fn location(self, path: &str) -> String {
        format!("{path}?aviso={}", self.key())
    }
}

/// Query string accepted by the views.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub aviso: Option<String>,
    pub codigo: Option<String>,
}

impl NoticeQuery {
    pub fn notice(&self) -> Option<Notice> {
        self.aviso.as_deref().and_then(Notice::from_key)
    }

    pub fn message(&self) -> Option<&'static str> {
        self.notice().map(Notice::message)
    }
}
