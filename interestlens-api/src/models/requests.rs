use interestlens_core::{ContentItem, PreferenceExtraction, SignalEvent, VoicePreferences};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub page_url: Option<String>,
    /// Fact-check news-like items before returning
    #[serde(default)]
    pub check_authenticity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    /// Item the event refers to; used to look up its cached embedding and topics
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(flatten)]
    pub event: SignalEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPreferencesRequest {
    pub preferences: VoicePreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    #[serde(flatten)]
    pub extraction: PreferenceExtraction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewQuery {
    pub url: String,
}
