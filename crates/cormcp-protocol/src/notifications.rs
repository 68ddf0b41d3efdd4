//! Payload shapes for the two notifications the dispatcher interprets
//! itself rather than routing to an application handler (§4.H).

use serde::{Deserialize, Serialize};

/// `notifications/cancelled` params: signals that the sender no longer
/// cares about the response to `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelledParams {
    #[serde(rename = "requestId")]
    pub request_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `notifications/progress` params: reports progress against a token
/// previously embedded in an outbound request's `params._meta.progressToken`.
///
/// `progress_token` is carried as a bare integer on the wire, matching the
/// request ID it was derived from, but is modeled as an opaque string here
/// since the protocol treats tokens as opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressParams {
    #[serde(rename = "progressToken")]
    pub progress_token: serde_json::Value,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

/// The `_meta.progressToken` envelope embedded in an outbound request's
/// `params` when the caller asked for progress notifications (§9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressMeta {
    #[serde(rename = "progressToken")]
    pub progress_token: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cancelled_params_round_trip() {
        let params = CancelledParams {
            request_id: 42,
            reason: Some("timeout".into()),
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, json!({"requestId": 42, "reason": "timeout"}));
        let back: CancelledParams = serde_json::from_value(value).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn progress_params_round_trip() {
        let params = ProgressParams {
            progress_token: json!(7),
            progress: 0.5,
            total: Some(1.0),
        };
        let value = serde_json::to_value(&params).unwrap();
        let back: ProgressParams = serde_json::from_value(value).unwrap();
        assert_eq!(back, params);
    }
}
