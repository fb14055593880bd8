//! Traversals issued by the engine and the capability that executes them

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Which element collection a traversal starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    /// Gremlin start step for this element kind.
    pub fn start_step(&self) -> &'static str {
        match self {
            Self::Vertex => "g.V()",
            Self::Edge => "g.E()",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Edge => write!(f, "edge"),
        }
    }
}

/// A traversal the server knows how to issue
///
/// Everything except `Raw` is structured so that backends which do not speak
/// Gremlin (the in-memory graph) can evaluate it directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Traversal {
    /// Cheap round trip used for health checks.
    Ping,
    VertexLabels,
    EdgeLabels,
    /// Distinct property keys among the first `sample` elements of a label.
    PropertyKeys {
        element: ElementKind,
        label: String,
        sample: usize,
    },
    /// Distinct values of `key` among the first `sample` elements of a label,
    /// capped at `limit` values.
    PropertyValues {
        element: ElementKind,
        label: String,
        key: String,
        sample: usize,
        limit: usize,
    },
    LabelCount {
        element: ElementKind,
        label: String,
    },
    TotalCount {
        element: ElementKind,
    },
    /// Distinct `{from, to, label}` projections over the first `limit` edges.
    RelationshipPatterns {
        limit: usize,
    },
    AddVertex {
        label: String,
        id: Option<Value>,
        properties: BTreeMap<String, Value>,
    },
    AddEdge {
        label: String,
        from: Value,
        to: Value,
        properties: BTreeMap<String, Value>,
    },
    /// Remove every vertex (and with them every edge).
    DropAll,
    Raw(String),
}

impl Traversal {
    /// Render as a Gremlin-Groovy script bound to the traversal source `g`.
    pub fn to_gremlin(&self) -> String {
        match self {
            Self::Ping => "g.inject(1)".to_string(),
            Self::VertexLabels => "g.V().label().dedup()".to_string(),
            Self::EdgeLabels => "g.E().label().dedup()".to_string(),
            Self::PropertyKeys {
                element,
                label,
                sample,
            } => format!(
                "{}.hasLabel({}).limit({}).properties().key().dedup()",
                element.start_step(),
                quote(label),
                sample
            ),
            Self::PropertyValues {
                element,
                label,
                key,
                sample,
                limit,
            } => format!(
                "{}.hasLabel({}).limit({}).values({}).dedup().limit({})",
                element.start_step(),
                quote(label),
                sample,
                quote(key),
                limit
            ),
            Self::LabelCount { element, label } => {
                format!("{}.hasLabel({}).count()", element.start_step(), quote(label))
            }
            Self::TotalCount { element } => format!("{}.count()", element.start_step()),
            Self::RelationshipPatterns { limit } => format!(
                "g.E().limit({}).project('from','to','label')\
                 .by(outV().label()).by(inV().label()).by(label()).dedup()",
                limit
            ),
            Self::AddVertex {
                label,
                id,
                properties,
            } => {
                let mut script = format!("g.addV({})", quote(label));
                if let Some(id) = id {
                    script.push_str(&format!(".property(T.id, {})", literal(id)));
                }
                push_properties(&mut script, properties);
                script
            }
            Self::AddEdge {
                label,
                from,
                to,
                properties,
            } => {
                let mut script = format!(
                    "g.V({}).addE({}).to(__.V({}))",
                    literal(from),
                    quote(label),
                    literal(to)
                );
                push_properties(&mut script, properties);
                script
            }
            Self::DropAll => "g.V().drop()".to_string(),
            Self::Raw(script) => script.clone(),
        }
    }

    /// Whether the traversal changes graph state.
    ///
    /// Raw scripts are checked for mutating steps by name only.
    pub fn is_mutation(&self) -> bool {
        match self {
            Self::AddVertex { .. } | Self::AddEdge { .. } | Self::DropAll => true,
            Self::Raw(script) => MUTATING_STEPS.iter().any(|step| script.contains(step)),
            _ => false,
        }
    }
}

const MUTATING_STEPS: &[&str] = &["addV(", "addE(", "drop(", "property(", "mergeV(", "mergeE("];

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gremlin())
    }
}

fn push_properties(script: &mut String, properties: &BTreeMap<String, Value>) {
    for (key, value) in properties {
        script.push_str(&format!(".property({}, {})", quote(key), literal(value)));
    }
}

/// Single-quoted Groovy string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Groovy literal for a JSON value.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_err() => format!("{}L", i),
            _ => n.to_string(),
        },
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) if map.is_empty() => "[:]".to_string(),
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), literal(v)))
                .collect();
            format!("[{}]", entries.join(", "))
        }
    }
}

/// The ability to run a traversal against a live graph
///
/// Implementations return results already passed through
/// [`normalize`](crate::normalize::normalize), and report transport failures
/// as [`Error::Connectivity`](crate::Error::Connectivity).
#[async_trait]
pub trait GraphClient: Send + Sync {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>>;

    /// Release any held connection
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: GraphClient + ?Sized> GraphClient for Arc<T> {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        (**self).execute(traversal).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
