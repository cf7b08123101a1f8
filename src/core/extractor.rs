//! Email extraction from the fixed webmail layout

use lazy_static::lazy_static;
use regex::Regex;
use crate::{
    BODY_SELECTOR, SENDER_ADDRESS_ATTR, SENDER_SELECTOR, SUBJECT_SELECTOR,
    TIMESTAMP_ATTR, TIMESTAMP_SELECTOR,
};
use crate::core::dom::PageDocument;
use crate::types::{EmailSnapshot, SkipReason};

lazy_static! {
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Reads the five snapshot fields from well-known locations
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailExtractor;

impl EmailExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract the open email. Missing subject or body means nothing is open.
    pub fn extract(&self, doc: &PageDocument) -> Result<EmailSnapshot, SkipReason> {
        let subject = doc
            .query_text(SUBJECT_SELECTOR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::X002_NO_SUBJECT)?;

        let body_text = doc
            .query_text(BODY_SELECTOR)
            .map(|b| normalize_whitespace(&b))
            .filter(|b| !b.is_empty())
            .ok_or(SkipReason::X002_NO_BODY)?;

        let sender_name = doc
            .query_text(SENDER_SELECTOR)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let sender_address = doc
            .query_attr(SENDER_SELECTOR, SENDER_ADDRESS_ATTR)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let timestamp = doc
            .query_attr(TIMESTAMP_SELECTOR, TIMESTAMP_ATTR)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        Ok(EmailSnapshot {
            subject,
            sender_name,
            sender_address,
            timestamp,
            body_text,
        })
    }
}

/// Collapse whitespace runs to one space and trim
pub fn normalize_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
