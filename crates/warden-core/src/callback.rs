// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inline-button callback payloads.
//!
//! Encoded as compact JSON, `{"id":"<uuid>","action":"approve"}`, which stays
//! within Telegram's 64-byte callback data limit.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::ValidationError;

/// Upper bound imposed by the transport on callback data.
pub const CALLBACK_DATA_MAX_BYTES: usize = 64;

/// The decision an arbiter takes on an application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Decline,
}

/// Decoded callback data of an approve/decline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub id: Uuid,
    pub action: DecisionAction,
}

impl CallbackPayload {
    pub fn new(id: Uuid, action: DecisionAction) -> Self {
        Self { id, action }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of a uuid and a unit enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn decode(data: &str) -> Result<Self, ValidationError> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            action: String,
        }

        let raw: Raw = serde_json::from_str(data.trim())
            .map_err(|e| ValidationError::InvalidCallback(e.to_string()))?;
        let id = Uuid::parse_str(&raw.id).map_err(|_| ValidationError::InvalidUuid(raw.id))?;
        let action = raw
            .action
            .parse::<DecisionAction>()
            .map_err(|_| ValidationError::UnknownVariant {
                field: "action",
                value: raw.action,
            })?;
        Ok(Self { id, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_payload_fits_callback_limit() {
        for action in [DecisionAction::Approve, DecisionAction::Decline] {
            let data = CallbackPayload::new(Uuid::now_v7(), action).encode();
            assert!(data.len() <= CALLBACK_DATA_MAX_BYTES, "{data} is too long");
        }
    }

    #[test]
    fn decode_reads_encoded_payload() {
        let payload = CallbackPayload::new(Uuid::now_v7(), DecisionAction::Decline);
        assert_eq!(CallbackPayload::decode(&payload.encode()).unwrap(), payload);
    }

    #[test]
    fn decode_rejects_bad_uuid() {
        let err = CallbackPayload::decode(r#"{"id":"nope","action":"approve"}"#).unwrap_err();
        assert_eq!(err, ValidationError::InvalidUuid("nope".into()));
    }

    #[test]
    fn decode_rejects_unknown_action() {
        let data = format!(r#"{{"id":"{}","action":"ban"}}"#, Uuid::nil());
        let err = CallbackPayload::decode(&data).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownVariant { field: "action", .. }));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            CallbackPayload::decode("approve:123"),
            Err(ValidationError::InvalidCallback(_))
        ));
    }
}
