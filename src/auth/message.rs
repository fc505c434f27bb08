// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in challenge message codec.
//!
//! Both authentication schemes sign the same line-oriented text:
//!
//! ```text
//! {domain} wants you to sign in with your Solana account:
//! {address}
//!
//! {statement}
//!
//! Action: {action}
//! URI: {uri}
//! Version: {version}
//! Chain ID: {chainId}
//! Nonce: {nonce}
//! Issued At: {issuedAt}
//! Expiration Time: {expirationTime}
//! Not Before: {notBefore}
//! Request ID: {requestId}
//! Resources:
//! - {resource}
//! ```
//!
//! Every block after the address is optional. With no `Action` line the text
//! is exactly the Sign-In-With-Solana canonical message, so the SIWS scheme
//! reuses [`ChallengeMessage::encode`] to rebuild what the wallet signed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const HEADER_SUFFIX: &str = " wants you to sign in with your Solana account:";
const RESOURCES_KEY: &str = "Resources:";

const KEY_ACTION: &str = "Action";
const KEY_URI: &str = "URI";
const KEY_VERSION: &str = "Version";
const KEY_CHAIN_ID: &str = "Chain ID";
const KEY_NONCE: &str = "Nonce";
const KEY_ISSUED_AT: &str = "Issued At";
const KEY_EXPIRATION_TIME: &str = "Expiration Time";
const KEY_NOT_BEFORE: &str = "Not Before";
const KEY_REQUEST_ID: &str = "Request ID";

const FIELD_KEYS: [&str; 9] = [
    KEY_ACTION,
    KEY_URI,
    KEY_VERSION,
    KEY_CHAIN_ID,
    KEY_NONCE,
    KEY_ISSUED_AT,
    KEY_EXPIRATION_TIME,
    KEY_NOT_BEFORE,
    KEY_REQUEST_ID,
];

/// Fields of a sign-in challenge.
///
/// Serialized in camelCase so it doubles as a `SolanaSignInInput` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeMessage {
    /// Host of the application requesting the sign-in.
    pub domain: String,
    /// Base58 wallet address expected to sign.
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Operation this signature authorizes (general scheme only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

impl ChallengeMessage {
    /// Render the message as the text a wallet signs.
    ///
    /// A blank statement is omitted, the same as `None`, so the text decodes
    /// back to the same fields.
    pub fn encode(&self) -> String {
        let mut text = format!("{}{HEADER_SUFFIX}\n{}", self.domain, self.address);

        if let Some(statement) = self.statement.as_deref().filter(|s| !s.trim().is_empty()) {
            text.push_str("\n\n");
            text.push_str(statement);
        }

        let mut fields: Vec<String> = Vec::new();
        let scalars = [
            (KEY_ACTION, &self.action),
            (KEY_URI, &self.uri),
            (KEY_VERSION, &self.version),
            (KEY_CHAIN_ID, &self.chain_id),
            (KEY_NONCE, &self.nonce),
            (KEY_ISSUED_AT, &self.issued_at),
            (KEY_EXPIRATION_TIME, &self.expiration_time),
            (KEY_NOT_BEFORE, &self.not_before),
            (KEY_REQUEST_ID, &self.request_id),
        ];
        for (key, value) in scalars {
            if let Some(value) = value {
                fields.push(format!("{key}: {value}"));
            }
        }
        if !self.resources.is_empty() {
            fields.push(RESOURCES_KEY.to_string());
            fields.extend(self.resources.iter().map(|r| format!("- {r}")));
        }

        if !fields.is_empty() {
            text.push_str("\n\n");
            text.push_str(&fields.join("\n"));
        }
        text
    }

    /// Parse message text back into fields.
    ///
    /// Lenient: a missing header yields an empty domain, unknown keys are
    /// skipped, and no field is required. Callers decide what must be present.
    pub fn decode(text: &str) -> Self {
        let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        let mut message = ChallengeMessage::default();

        if let Some(header) = lines.first() {
            message.domain = header
                .trim()
                .strip_suffix(HEADER_SUFFIX.trim_start())
                .map(|d| d.trim().to_string())
                .unwrap_or_default();
        }
        if let Some(address) = lines.get(1) {
            message.address = address.trim().to_string();
        }

        let rest = lines.get(2..).unwrap_or_default();
        let blocks: Vec<&[&str]> = rest
            .split(|line| line.trim().is_empty())
            .filter(|block| !block.is_empty())
            .collect();

        for (index, block) in blocks.iter().enumerate() {
            if index == 0 && !is_field_line(block[0]) {
                message.statement = Some(block.join("\n"));
                continue;
            }
            message.parse_fields(block);
        }

        message
    }

    fn parse_fields(&mut self, lines: &[&str]) {
        let mut in_resources = false;
        for raw in lines {
            let line = raw.trim();
            if line == RESOURCES_KEY {
                in_resources = true;
                continue;
            }
            if in_resources {
                if let Some(item) = line.strip_prefix('-') {
                    self.resources.push(item.trim().to_string());
                    continue;
                }
                in_resources = false;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                KEY_ACTION => self.action = value,
                KEY_URI => self.uri = value,
                KEY_VERSION => self.version = value,
                KEY_CHAIN_ID => self.chain_id = value,
                KEY_NONCE => self.nonce = value,
                KEY_ISSUED_AT => self.issued_at = value,
                KEY_EXPIRATION_TIME => self.expiration_time = value,
                KEY_NOT_BEFORE => self.not_before = value,
                KEY_REQUEST_ID => self.request_id = value,
                _ => {}
            }
        }
    }

    /// Copy of this message without the action line (SIWS canonical form).
    pub fn without_action(&self) -> Self {
        Self {
            action: None,
            ..self.clone()
        }
    }
}

fn is_field_line(line: &str) -> bool {
    let line = line.trim();
    line == RESOURCES_KEY
        || FIELD_KEYS
            .iter()
            .any(|key| line.strip_prefix(key).is_some_and(|rest| rest.starts_with(':')))
}

/// Format a timestamp the way browsers' `toISOString()` does.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
