//! Flow document data model: `Node`, `Edge`, `ProcessFlow`, `Configuration`,
//! and the auxiliary catalogs consumed by node handlers.

use crate::error::ConfigError;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One outgoing edge of a [`Node`].
///
/// `input_keys` is the DTMF digit string that selects this edge; absent
/// on linear edges, where the first (only meaningful) entry is always
/// taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Target node.
    #[serde(rename = "ChildNodeId")]
    pub child_node_id: NodeId,

    /// DTMF digits that select this edge. Some flow exports use the
    /// legacy field name `DTMFInput` instead; both are accepted on
    /// deserialization.
    #[serde(
        rename = "InputKeys",
        alias = "DTMFInput",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_keys: Option<String>,
}

/// An immutable node in a `ProcessFlow`.
///
/// Operation-specific attributes (audio file, TTS text, API URL, …) are
/// kept as an open `serde_json::Value` map rather than one giant struct
/// with every handler family's fields: the node's meaning is opaque to
/// everything except the handler family that owns its opcode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique ID within the `ProcessFlow`.
    #[serde(rename = "NodeId")]
    pub node_id: NodeId,

    /// Display name; not used for routing.
    #[serde(rename = "NodeName", default)]
    pub node_name: Option<String>,

    /// Opcode selecting which handler family executes this node.
    #[serde(rename = "OperationCode")]
    pub operation_code: i64,

    /// Whether this is the flow's single entry point.
    #[serde(rename = "IsStartNode", default)]
    pub is_start_node: bool,

    /// Outgoing edges, in declaration order. Empty means terminal.
    #[serde(rename = "ChildNodeConfig", default)]
    pub child_node_config: Vec<Edge>,

    /// Operation-specific attributes, keyed exactly as they appear in
    /// the flow document (`AudioFile`, `MaxDigits`, `Url`, …).
    #[serde(flatten)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Node {
    /// Read a string attribute, if present.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Read an integer attribute, if present.
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(|v| v.as_i64())
    }

    /// Read a boolean attribute, if present.
    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(|v| v.as_bool())
    }
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessFlow {
    /// Nodes in declaration order.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl ProcessFlow {
    /// Look up a node by ID.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == id)
    }

    /// The first node flagged `IsStartNode == true`, in declaration order.
    pub fn find_start_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_start_node)
    }

    /// Count of nodes flagged `IsStartNode == true`.
    pub fn start_node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_start_node).count()
    }
}

/// Free-form settings bag (TTS defaults, call-center parameters, …).
pub type GeneralSettings = HashMap<String, serde_json::Value>;

/// One configuration entry inside an `IVRConfiguration` array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// The node graph.
    #[serde(rename = "IVRProcessFlow", default)]
    pub process_flow: ProcessFlow,

    /// Free-form settings for this configuration.
    #[serde(rename = "GeneralSettingValues", default)]
    pub general_settings: GeneralSettings,
}

/// Root shape of the IVR flow document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flow {
    /// Always at least one entry; only the first is used (§3, §6).
    #[serde(rename = "IVRConfiguration", default)]
    pub ivr_configuration: Vec<Configuration>,
}

impl Flow {
    /// The first (and authoritative) configuration.
    pub fn configuration(&self) -> Option<&Configuration> {
        self.ivr_configuration.first()
    }
}

/// One entry in the endpoint catalog (`webapi` document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL or URL template.
    pub url: String,
    /// HTTP method (`"GET"`, `"POST"`, …).
    #[serde(default = "default_method")]
    pub method: String,
    /// Headers attached to every request against this endpoint.
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Whether calls to this endpoint must attach an `Authorization`
    /// header from the token cache.
    #[serde(default)]
    pub auth_required: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// `{ "result": { <endpointName>: Endpoint, ... } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointCatalog {
    /// Endpoints keyed by logical name.
    pub result: HashMap<String, Endpoint>,
}

impl EndpointCatalog {
    /// Look up an endpoint by name.
    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.result.get(name)
    }
}

/// Opaque map from extension ID to extension attributes, consumed only
/// by the transfer handler family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionMap(pub HashMap<String, serde_json::Value>);

/// Opaque map from recording-type ID to recording attributes, consumed
/// only by the recording handler family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingTypeMap(pub HashMap<String, serde_json::Value>);

/// Validate the invariants from §3/§8: edge integrity, opcode closure,
/// and start-node uniqueness. Collects every violation rather than
/// failing on the first, so operators see the complete error report.
pub fn validate(
    doc_name: &str,
    flow: &ProcessFlow,
    known_opcodes: &[i64],
) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match flow.start_node_count() {
        0 => errors.push(ConfigError::ConfigValidationError {
            name: doc_name.to_string(),
            field: "IsStartNode".to_string(),
            reason: "no node is flagged as the start node".to_string(),
        }),
        1 => {}
        n => errors.push(ConfigError::ConfigValidationError {
            name: doc_name.to_string(),
            field: "IsStartNode".to_string(),
            reason: format!("{n} nodes are flagged as the start node; exactly one is required"),
        }),
    }

    for node in &flow.nodes {
        if !known_opcodes.contains(&node.operation_code) {
            errors.push(ConfigError::ConfigValidationError {
                name: doc_name.to_string(),
                field: format!("nodes[{}].OperationCode", node.node_id),
                reason: format!("opcode {} is not in the dispatcher's domain", node.operation_code),
            });
        }
        for edge in &node.child_node_config {
            if flow.find(edge.child_node_id).is_none() {
                errors.push(ConfigError::ConfigValidationError {
                    name: doc_name.to_string(),
                    field: format!("nodes[{}].ChildNodeConfig", node.node_id),
                    reason: format!(
                        "edge references node {} which does not exist",
                        edge.child_node_id
                    ),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
