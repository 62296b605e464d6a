//! Embedding modes and the messages the injected bridge script posts.

use serde::{Deserialize, Serialize};

use crate::surface::{SelectionReport, SurfaceEventKind};

/// Longest selection the bridge reports, in characters.
pub const MAX_BRIDGE_SELECTION_CHARS: usize = 500;

/// How a third-party page is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Rewritten HTML in a sandboxed frame; selection capture and AI actions work.
    #[default]
    Enhanced,
    /// Original URL loaded natively; cross-origin rules block selection capture.
    Direct,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Enhanced => ViewMode::Direct,
            ViewMode::Direct => ViewMode::Enhanced,
        }
    }

    pub fn captures_selection(self) -> bool {
        matches!(self, ViewMode::Enhanced)
    }
}

/// `postMessage` payloads from the bridge script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BridgeMessage {
    Highlight(SelectionReport),
    Navigate { url: String },
    /// Sent by the error page's "switch mode" button.
    SwitchMode,
}

impl BridgeMessage {
    /// Surface event this message stands for. Selections outside 1..=500 characters
    /// and blank navigations carry nothing and map to `None`.
    pub fn into_event_kind(self) -> Option<SurfaceEventKind> {
        match self {
            BridgeMessage::Highlight(mut report) => {
                report.text = report.text.trim().to_string();
                let len = report.text.chars().count();
                if len == 0 || len > MAX_BRIDGE_SELECTION_CHARS {
                    return None;
                }
                Some(SurfaceEventKind::Selection(report))
            }
            BridgeMessage::Navigate { url } => {
                let url = url.trim();
                (!url.is_empty()).then(|| SurfaceEventKind::WindowOpen(url.to_string()))
            }
            BridgeMessage::SwitchMode => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trip() {
        assert_eq!(ViewMode::Enhanced.toggled(), ViewMode::Direct);
        assert_eq!(ViewMode::Direct.toggled(), ViewMode::Enhanced);
        assert!(!ViewMode::Direct.captures_selection());
    }

    #[test]
    fn test_parse_highlight() {
        let msg: BridgeMessage = serde_json::from_str(
            r#"{"type":"highlight","text":"  photosynthesis ","rect":{"left":4,"top":8,"width":30,"height":12},"devicePixelRatio":2}"#,
        )
        .unwrap();
        match msg.into_event_kind() {
            Some(SurfaceEventKind::Selection(report)) => {
                assert_eq!(report.text, "photosynthesis");
                assert_eq!(report.rect.top, 8.0);
                assert_eq!(report.device_pixel_ratio, 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_selection_length_bounds() {
        let long = "x".repeat(MAX_BRIDGE_SELECTION_CHARS + 1);
        let msg = BridgeMessage::Highlight(SelectionReport {
            text: long,
            rect: Default::default(),
            device_pixel_ratio: 1.0,
        });
        assert!(msg.into_event_kind().is_none());

        let blank: BridgeMessage = serde_json::from_str(r#"{"type":"highlight","text":"   "}"#).unwrap();
        assert!(blank.into_event_kind().is_none());
    }

    #[test]
    fn test_navigate_becomes_window_open() {
        let msg: BridgeMessage =
            serde_json::from_str(r#"{"type":"navigate","url":"https://ex.com/next"}"#).unwrap();
        assert_eq!(
            msg.into_event_kind(),
            Some(SurfaceEventKind::WindowOpen("https://ex.com/next".into()))
        );
    }

    #[test]
    fn test_switch_mode_tag() {
        let msg: BridgeMessage = serde_json::from_str(r#"{"type":"switchMode"}"#).unwrap();
        assert_eq!(msg, BridgeMessage::SwitchMode);
    }
}
