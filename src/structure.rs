use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Parsed description of a folder tree.
///
/// Objects become [`StructureNode::Group`], arrays become [`StructureNode::List`]
/// and strings become [`StructureNode::Atom`]. Anything else is kept as
/// [`StructureNode::Unsupported`] so the materializer can report it with the
/// path where it appears.
#[derive(Clone, Debug, PartialEq)]
pub enum StructureNode {
    Group(Vec<(String, StructureNode)>),
    List(Vec<StructureNode>),
    Atom(String),
    Unsupported(Value),
}

impl StructureNode {
    /// Short description used in error messages.
    pub fn kind(&self) -> String {
        match self {
            StructureNode::Group(_) => "group".to_owned(),
            StructureNode::List(_) => "list".to_owned(),
            StructureNode::Atom(name) => format!("folder name {name:?}"),
            StructureNode::Unsupported(Value::Null) => "null".to_owned(),
            StructureNode::Unsupported(Value::Bool(value)) => format!("boolean {value}"),
            StructureNode::Unsupported(Value::Number(value)) => format!("number {value}"),
            StructureNode::Unsupported(other) => format!("value {other}"),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StructureNode::Group(entries) => entries.is_empty(),
            StructureNode::List(items) => items.is_empty(),
            StructureNode::Atom(_) | StructureNode::Unsupported(_) => false,
        }
    }

    /// Re-encode the tree as pretty-printed JSON.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<Value> for StructureNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => StructureNode::Group(
                map.into_iter()
                    .map(|(name, child)| (name, StructureNode::from(child)))
                    .collect(),
            ),
            Value::Array(items) => {
                StructureNode::List(items.into_iter().map(StructureNode::from).collect())
            }
            Value::String(name) => StructureNode::Atom(name),
            other => StructureNode::Unsupported(other),
        }
    }
}

impl Serialize for StructureNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            StructureNode::Group(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, child) in entries {
                    map.serialize_entry(name, child)?;
                }
                map.end()
            }
            StructureNode::List(items) => serializer.collect_seq(items),
            StructureNode::Atom(name) => serializer.serialize_str(name),
            StructureNode::Unsupported(value) => value.serialize(serializer),
        }
    }
}

/// Parse structure text, falling back to one folder name per line when the
/// text is not a JSON document. Never fails; blank input yields an empty list.
pub fn parse(raw: &str) -> StructureNode {
    let text = strip_bom(raw);
    match serde_json::from_str::<Value>(text) {
        Ok(value) => StructureNode::from(value),
        Err(err) => {
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                warn!(
                    line = err.line(),
                    column = err.column(),
                    "input looks like JSON but does not decode ({err}); treating each line as a folder name"
                );
            } else {
                debug!("input is not JSON; treating each line as a folder name");
            }
            plain_names(text)
        }
    }
}

/// Parse structure text as JSON only.
pub fn parse_strict(raw: &str) -> Result<StructureNode> {
    let value: Value = serde_json::from_str(strip_bom(raw))?;
    Ok(StructureNode::from(value))
}

fn plain_names(text: &str) -> StructureNode {
    StructureNode::List(
        text.split(is_line_break)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| StructureNode::Atom(line.to_owned()))
            .collect(),
    )
}

/// Line boundaries, including the form feed, record separators and the
/// Unicode line and paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn strip_bom(raw: &str) -> &str {
    raw.strip_prefix('\u{feff}').unwrap_or(raw)
}
