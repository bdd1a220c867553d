use serde::{Deserialize, Serialize};

use crate::stats::PadStats;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum OutboundMessage {
    #[serde(rename = "kinto-sync")]
    SyncRequest,
    #[serde(rename = "kinto-load")]
    LoadRequest,
    #[serde(rename = "kinto-save")]
    Save { content: String },
    #[serde(rename = "metrics-changed")]
    MetricsChanged { context: PadStats },
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "action")]
pub enum InboundMessage {
    #[serde(rename = "kinto-loaded")]
    ContentLoaded {
        #[serde(default)]
        data: Option<String>,
    },
    #[serde(rename = "text-change")]
    ChangePending,
    #[serde(rename = "text-synced")]
    ContentSynced {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        conflict: bool,
    },
}

impl OutboundMessage {
    pub fn action(&self) -> &'static str {
        match self {
            OutboundMessage::SyncRequest => "kinto-sync",
            OutboundMessage::LoadRequest => "kinto-load",
            OutboundMessage::Save { .. } => "kinto-save",
            OutboundMessage::MetricsChanged { .. } => "metrics-changed",
        }
    }
}
