//! Capability assertions for the server role (§4.I): registering a
//! tool/prompt/resource without the matching capability is a configuration
//! error caught at registration time; server-initiated calls and
//! server-emitted notifications are gated symmetrically to the client side.

use cormcp_protocol::{ClientCapabilities, Error, ServerCapabilities};

pub(crate) fn assert_local_tools_capability(local: &ServerCapabilities) -> Result<(), Error> {
    require(local.tools.is_some(), "tools", "tools/call")
}

pub(crate) fn assert_local_prompts_capability(local: &ServerCapabilities) -> Result<(), Error> {
    require(local.prompts.is_some(), "prompts", "prompts/get")
}

pub(crate) fn assert_local_resources_capability(local: &ServerCapabilities) -> Result<(), Error> {
    require(local.resources.is_some(), "resources", "resources/read")
}

/// Gate a server-initiated outbound call against the client's advertised
/// capabilities.
pub(crate) fn assert_remote_capability(remote: Option<&ClientCapabilities>, method: &str) -> Result<(), Error> {
    let satisfied = match method {
        "sampling/createMessage" => remote.and_then(|c| c.sampling.as_ref()).is_some(),
        "roots/list" => remote.and_then(|c| c.roots.as_ref()).is_some(),
        _ => true,
    };
    if satisfied {
        Ok(())
    } else {
        Err(Error::CapabilityMissing {
            capability: capability_name(method).to_string(),
            method: method.to_string(),
        })
    }
}

/// Gate a server-emitted notification against the server's own advertised
/// capabilities.
pub(crate) fn assert_local_notification_capability(local: &ServerCapabilities, method: &str) -> Result<(), Error> {
    let satisfied = match method {
        "notifications/message" => local.logging.is_some(),
        "notifications/tools/list_changed" => local.tools.as_ref().and_then(|t| t.list_changed).unwrap_or(false),
        "notifications/prompts/list_changed" => local.prompts.as_ref().and_then(|p| p.list_changed).unwrap_or(false),
        "notifications/resources/list_changed" => {
            local.resources.as_ref().and_then(|r| r.list_changed).unwrap_or(false)
        }
        "notifications/resources/updated" => local.resources.is_some(),
        _ => true,
    };
    if satisfied {
        Ok(())
    } else {
        Err(Error::CapabilityMissing {
            capability: capability_name(method).to_string(),
            method: method.to_string(),
        })
    }
}

fn capability_name(method: &str) -> &'static str {
    match method {
        "sampling/createMessage" => "sampling",
        "roots/list" => "roots",
        "notifications/message" => "logging",
        "notifications/tools/list_changed" => "tools.listChanged",
        "notifications/prompts/list_changed" => "prompts.listChanged",
        "notifications/resources/list_changed" => "resources.listChanged",
        "notifications/resources/updated" => "resources",
        _ => "unknown",
    }
}

fn require(satisfied: bool, capability: &str, method: &str) -> Result<(), Error> {
    if satisfied {
        Ok(())
    } else {
        Err(Error::CapabilityMissing {
            capability: capability.to_string(),
            method: method.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_a_tool_without_the_capability_fails() {
        let caps = ServerCapabilities::default();
        assert!(assert_local_tools_capability(&caps).is_err());
    }

    #[test]
    fn sampling_requires_client_capability() {
        assert!(assert_remote_capability(None, "sampling/createMessage").is_err());
        let caps = ClientCapabilities {
            sampling: Some(Default::default()),
            ..Default::default()
        };
        assert!(assert_remote_capability(Some(&caps), "sampling/createMessage").is_ok());
    }
}
