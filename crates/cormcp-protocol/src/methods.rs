//! The closed set of well-known MCP method and notification names (§3).
//!
//! [`Method`] is the discriminated, strongly typed view; any name outside
//! the registry decodes to [`Method::Custom`] and still round-trips as the
//! original string, per the "unknown methods MUST round-trip as opaque"
//! invariant.

use std::fmt;

/// A well-known MCP method, or an opaque custom one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesTemplatesList,
    ResourcesRead,
    ResourcesSubscribe,
    ResourcesUnsubscribe,
    PromptsList,
    PromptsGet,
    LoggingSetLevel,
    SamplingCreateMessage,
    CompletionComplete,
    RootsList,
    NotificationInitialized,
    NotificationCancelled,
    NotificationProgress,
    NotificationRootsListChanged,
    NotificationToolsListChanged,
    NotificationResourcesListChanged,
    NotificationResourcesUpdated,
    NotificationPromptsListChanged,
    NotificationLoggingMessage,
    /// An escape hatch for methods outside the registry; the original wire
    /// string is preserved exactly.
    Custom(String),
}

impl Method {
    /// Parse a wire method name into its typed form.
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "resources/templates/list" => Self::ResourcesTemplatesList,
            "resources/read" => Self::ResourcesRead,
            "resources/subscribe" => Self::ResourcesSubscribe,
            "resources/unsubscribe" => Self::ResourcesUnsubscribe,
            "prompts/list" => Self::PromptsList,
            "prompts/get" => Self::PromptsGet,
            "logging/setLevel" => Self::LoggingSetLevel,
            "sampling/createMessage" => Self::SamplingCreateMessage,
            "completion/complete" => Self::CompletionComplete,
            "roots/list" => Self::RootsList,
            "notifications/initialized" => Self::NotificationInitialized,
            "notifications/cancelled" => Self::NotificationCancelled,
            "notifications/progress" => Self::NotificationProgress,
            "notifications/roots/list_changed" => Self::NotificationRootsListChanged,
            "notifications/tools/list_changed" => Self::NotificationToolsListChanged,
            "notifications/resources/list_changed" => Self::NotificationResourcesListChanged,
            "notifications/resources/updated" => Self::NotificationResourcesUpdated,
            "notifications/prompts/list_changed" => Self::NotificationPromptsListChanged,
            "notifications/message" => Self::NotificationLoggingMessage,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The wire string for this method, matching `parse` exactly.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::ResourcesList => "resources/list",
            Self::ResourcesTemplatesList => "resources/templates/list",
            Self::ResourcesRead => "resources/read",
            Self::ResourcesSubscribe => "resources/subscribe",
            Self::ResourcesUnsubscribe => "resources/unsubscribe",
            Self::PromptsList => "prompts/list",
            Self::PromptsGet => "prompts/get",
            Self::LoggingSetLevel => "logging/setLevel",
            Self::SamplingCreateMessage => "sampling/createMessage",
            Self::CompletionComplete => "completion/complete",
            Self::RootsList => "roots/list",
            Self::NotificationInitialized => "notifications/initialized",
            Self::NotificationCancelled => "notifications/cancelled",
            Self::NotificationProgress => "notifications/progress",
            Self::NotificationRootsListChanged => "notifications/roots/list_changed",
            Self::NotificationToolsListChanged => "notifications/tools/list_changed",
            Self::NotificationResourcesListChanged => "notifications/resources/list_changed",
            Self::NotificationResourcesUpdated => "notifications/resources/updated",
            Self::NotificationPromptsListChanged => "notifications/prompts/list_changed",
            Self::NotificationLoggingMessage => "notifications/message",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_round_trips() {
        for name in [
            "initialize",
            "ping",
            "tools/call",
            "resources/subscribe",
            "notifications/cancelled",
            "notifications/progress",
        ] {
            assert_eq!(Method::parse(name).as_str(), name);
        }
    }

    #[test]
    fn unknown_method_is_opaque_custom() {
        let m = Method::parse("experimental/frobnicate");
        assert_eq!(m, Method::Custom("experimental/frobnicate".to_string()));
        assert_eq!(m.as_str(), "experimental/frobnicate");
    }
}
