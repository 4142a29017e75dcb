use {
    base64::Engine,
    relay_common::{Continuation, MessageId},
    serde::{Deserialize, Serialize},
};

use crate::error::{Context, Result};

/// Everything needed to resume a conversation on the next turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub continuation: Continuation,
    /// Images accumulated across the thread, oldest first.
    pub images: Vec<Vec<u8>>,
}

impl ConversationState {
    #[must_use]
    pub fn new(continuation: Continuation, images: Vec<Vec<u8>>) -> Self {
        Self {
            continuation,
            images,
        }
    }
}

/// Wire record stored under the `channel` and `message` keys.
///
/// Images live under their own key so the channel pointer stays small;
/// `message_id` names the turn whose images belong to this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TurnRecord {
    #[serde(flatten)]
    pub continuation: Continuation,
    pub message_id: MessageId,
}

impl TurnRecord {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("decoding turn record")
    }
}

pub(crate) fn encode_images(images: &[Vec<u8>]) -> Result<String> {
    let encoded: Vec<String> = images
        .iter()
        .map(|img| base64::engine::general_purpose::STANDARD.encode(img))
        .collect();
    Ok(serde_json::to_string(&encoded)?)
}

pub(crate) fn decode_images(raw: &str) -> Result<Vec<Vec<u8>>> {
    let encoded: Vec<String> = serde_json::from_str(raw).context("decoding image list")?;
    encoded
        .iter()
        .map(|s| {
            base64::engine::general_purpose::STANDARD
                .decode(s)
                .context("decoding image bytes")
        })
        .collect()
}
