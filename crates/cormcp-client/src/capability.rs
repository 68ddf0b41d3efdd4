//! The client-side capability assertion table (§4.I).

use cormcp_protocol::{Error, ServerCapabilities};

/// Which server capability, if any, a given outbound method requires.
fn required_capability(method: &str) -> Option<&'static str> {
    match method {
        "logging/setLevel" => Some("logging"),
        "prompts/list" | "prompts/get" | "completion/complete" => Some("prompts"),
        "resources/list" | "resources/templates/list" | "resources/read" => Some("resources"),
        "resources/subscribe" | "resources/unsubscribe" => Some("resources.subscribe"),
        "tools/list" | "tools/call" => Some("tools"),
        _ => None,
    }
}

/// Assert that `remote` advertises what `method` needs. A `None` `remote`
/// (handshake not yet complete) is treated as "nothing advertised".
pub(crate) fn assert_remote_capability(
    remote: Option<&ServerCapabilities>,
    method: &str,
) -> Result<(), Error> {
    let Some(capability) = required_capability(method) else {
        return Ok(());
    };
    let satisfied = match (capability, remote) {
        (_, None) => false,
        ("logging", Some(caps)) => caps.logging.is_some(),
        ("prompts", Some(caps)) => caps.prompts.is_some(),
        ("resources", Some(caps)) => caps.resources.is_some(),
        ("resources.subscribe", Some(caps)) => caps.supports_resource_subscribe(),
        ("tools", Some(caps)) => caps.tools.is_some(),
        _ => false,
    };
    if satisfied {
        Ok(())
    } else {
        Err(Error::CapabilityMissing {
            capability: capability.to_string(),
            method: method.to_string(),
        })
    }
}
