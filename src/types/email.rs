//! Email snapshot and identity

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The five fields read from the open email. Immutable once extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSnapshot {
    pub subject: String,
    pub sender_name: String,
    pub sender_address: String,
    pub timestamp: String,
    pub body_text: String,
}

impl EmailSnapshot {
    pub fn new(
        subject: impl Into<String>,
        sender_name: impl Into<String>,
        sender_address: impl Into<String>,
        timestamp: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender_name: sender_name.into(),
            sender_address: sender_address.into(),
            timestamp: timestamp.into(),
            body_text: body_text.into(),
        }
    }

    /// Dedup key: subject + sender address + timestamp
    pub fn identity(&self) -> EmailIdentity {
        EmailIdentity(format!(
            "{}{}{}",
            self.subject, self.sender_address, self.timestamp
        ))
    }

    /// Sender as shown on the panel: `Name <address>`, or whichever part exists
    pub fn sender_display(&self) -> String {
        match (self.sender_name.is_empty(), self.sender_address.is_empty()) {
            (false, false) => format!("{} <{}>", self.sender_name, self.sender_address),
            (false, true) => self.sender_name.clone(),
            (true, false) => self.sender_address.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Concatenated identity key. Distinct emails sharing subject, sender and
/// timestamp collide; that is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailIdentity(String);

impl EmailIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 prefix, safe to put in logs
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}
