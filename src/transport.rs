use crate::language::LanguageSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// Messages sent to the content script of the checked page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageMessage {
    GetLanguagesSettings,
    #[serde(rename_all = "camelCase")]
    CheckText { server_url: String, page_url: String },
    #[serde(rename_all = "camelCase")]
    ApplyCorrection {
        error_offset: usize,
        error_text: String,
        replacement: String,
        markup_list: Vec<MarkupItem>,
        server_url: String,
        page_url: String,
    },
    ClosePopup,
    #[serde(rename_all = "camelCase")]
    ReactivateIcon { page_url: String },
    ShowErrorNumberOnMarker { data: Value },
}

impl PageMessage {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetLanguagesSettings => "getLanguagesSettings",
            Self::CheckText { .. } => "checkText",
            Self::ApplyCorrection { .. } => "applyCorrection",
            Self::ClosePopup => "closePopup",
            Self::ReactivateIcon { .. } => "reactivateIcon",
            Self::ShowErrorNumberOnMarker { .. } => "showErrorNumberOnMarker",
        }
    }
}

/// One piece of the page's text: plain text, or markup that is either
/// skipped or stands for some text (`interpretAs`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkupItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpret_as: Option<String>,
}

impl MarkupItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

pub fn markup_list_to_text(items: &[MarkupItem]) -> String {
    let mut text = String::new();
    for item in items {
        if let Some(t) = &item.text {
            text.push_str(t);
        } else if let Some(interpreted) = &item.interpret_as {
            text.push_str(interpreted);
        }
    }
    text
}

/// Reply to `checkText`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageResponse {
    pub markup_list: Vec<MarkupItem>,
    pub meta_data: Value,
    pub is_editable_text: bool,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub message: Option<String>,
}

impl PageResponse {
    pub fn text(&self) -> String {
        markup_list_to_text(&self.markup_list)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Page channel closed: {0}")]
    Disconnected(String),
    #[error("Invalid page response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Request/response channel to the page. `Ok(None)` means the page did
/// not answer.
#[allow(async_fn_in_trait)]
pub trait PageTransport {
    async fn send(&self, message: PageMessage) -> Result<Option<Value>, TransportError>;
}

/// Decode a reply, treating JSON `null` like no reply.
pub fn decode_reply<T: serde::de::DeserializeOwned>(
    reply: Option<Value>,
) -> Result<Option<T>, TransportError> {
    match reply {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

/// A page whose text is fixed up front. Records every message it gets.
#[derive(Debug, Default)]
pub struct StaticPageTransport {
    pub response: Option<PageResponse>,
    pub languages: LanguageSettings,
    sent: Mutex<Vec<PageMessage>>,
}

impl StaticPageTransport {
    pub fn new(url: &str, text: &str, is_editable_text: bool) -> Self {
        Self {
            response: Some(PageResponse {
                markup_list: vec![MarkupItem::text(text)],
                is_editable_text,
                url: Some(url.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// A page that never answers.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<PageMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_actions(&self) -> Vec<&'static str> {
        self.sent().iter().map(PageMessage::action).collect()
    }
}

impl PageTransport for StaticPageTransport {
    async fn send(&self, message: PageMessage) -> Result<Option<Value>, TransportError> {
        log::debug!("Page message: {}", message.action());
        let reply = match &message {
            PageMessage::GetLanguagesSettings => Some(serde_json::to_value(&self.languages)?),
            PageMessage::CheckText { .. } => match &self.response {
                Some(response) => Some(serde_json::to_value(response)?),
                None => None,
            },
            _ => Some(Value::Null),
        };
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_format() {
        let msg = PageMessage::CheckText {
            server_url: "https://s".to_string(),
            page_url: "https://p".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"action": "checkText", "serverUrl": "https://s", "pageUrl": "https://p"})
        );
        assert_eq!(
            serde_json::to_value(PageMessage::ClosePopup).unwrap(),
            json!({"action": "closePopup"})
        );
        let apply = PageMessage::ApplyCorrection {
            error_offset: 3,
            error_text: "teh".to_string(),
            replacement: "the".to_string(),
            markup_list: vec![MarkupItem::text("teh")],
            server_url: "s".to_string(),
            page_url: "p".to_string(),
        };
        let value = serde_json::to_value(&apply).unwrap();
        assert_eq!(value["action"], "applyCorrection");
        assert_eq!(value["errorOffset"], 3);
        assert_eq!(value["markupList"][0]["text"], "teh");
    }

    #[test]
    fn test_markup_list_to_text() {
        let items = vec![
            MarkupItem::text("Hello"),
            MarkupItem {
                markup: Some("<br>".to_string()),
                interpret_as: Some("\n".to_string()),
                ..Default::default()
            },
            MarkupItem {
                markup: Some("<b>".to_string()),
                ..Default::default()
            },
            MarkupItem::text("world"),
        ];
        assert_eq!(markup_list_to_text(&items), "Hello\nworld");
    }

    #[test]
    fn test_page_response_decodes_partial_json() {
        let response: Option<PageResponse> = decode_reply(Some(json!({
            "markupList": [{"text": "abc"}],
            "isEditableText": true
        })))
        .unwrap();
        let response = response.unwrap();
        assert_eq!(response.text(), "abc");
        assert!(response.is_editable_text);
        assert_eq!(response.status, None);

        let none: Option<PageResponse> = decode_reply(Some(Value::Null)).unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_static_transport_records_messages() {
        let page = StaticPageTransport::new("https://example.com", "text", false);
        let reply = page
            .send(PageMessage::CheckText {
                server_url: "s".to_string(),
                page_url: "p".to_string(),
            })
            .await
            .unwrap();
        assert!(reply.is_some());
        page.send(PageMessage::ClosePopup).await.unwrap();
        assert_eq!(page.sent_actions(), vec!["checkText", "closePopup"]);

        let silent = StaticPageTransport::silent();
        let reply = silent
            .send(PageMessage::CheckText {
                server_url: "s".to_string(),
                page_url: "p".to_string(),
            })
            .await
            .unwrap();
        assert!(reply.is_none());
    }
}
