//! In-memory graph backend
//!
//! Evaluates every structured [`Traversal`] directly against vertices and
//! edges held in memory. Raw Gremlin scripts are not interpreted. Useful for
//! tests, demos and offline schema exploration of an exported graph.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use gremlin_mcp_core::bulk::GraphData;
use gremlin_mcp_core::{ElementKind, Error, GraphClient, ImportFormat, Result, Traversal};
use serde_json::{json, Map, Value};

use crate::error::{BackendError, BackendResult};

#[derive(Debug, Clone)]
struct Vertex {
    id: Value,
    label: String,
    properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
struct Edge {
    id: Value,
    label: String,
    out_v: Value,
    in_v: Value,
    properties: BTreeMap<String, Value>,
}

/// Something with a label and properties
trait Element {
    fn label(&self) -> &str;
    fn properties(&self) -> &BTreeMap<String, Value>;
}

impl Element for Vertex {
    fn label(&self) -> &str {
        &self.label
    }
    fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

impl Element for Edge {
    fn label(&self) -> &str {
        &self.label
    }
    fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

#[derive(Debug, Default)]
struct GraphState {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    next_id: u64,
}

impl GraphState {
    fn allocate_id(&mut self) -> Value {
        loop {
            self.next_id += 1;
            let candidate = Value::from(self.next_id);
            if !self.vertices.iter().any(|v| v.id == candidate)
                && !self.edges.iter().any(|e| e.id == candidate)
            {
                return candidate;
            }
        }
    }

    fn add_vertex(
        &mut self,
        label: &str,
        id: Option<&Value>,
        properties: &BTreeMap<String, Value>,
    ) -> BackendResult<Value> {
        let id = match id {
            Some(id) if self.vertices.iter().any(|v| &v.id == id) => {
                return Err(BackendError::DuplicateVertex(id.to_string()));
            }
            Some(id) => id.clone(),
            None => self.allocate_id(),
        };
        let vertex = Vertex {
            id,
            label: label.to_string(),
            properties: properties.clone(),
        };
        let rendered = vertex_json(&vertex);
        self.vertices.push(vertex);
        Ok(rendered)
    }

    fn add_edge(
        &mut self,
        label: &str,
        from: &Value,
        to: &Value,
        properties: &BTreeMap<String, Value>,
    ) -> BackendResult<Value> {
        for endpoint in [from, to] {
            if !self.vertices.iter().any(|v| &v.id == endpoint) {
                return Err(BackendError::UnknownVertex(endpoint.to_string()));
            }
        }
        let edge = Edge {
            id: self.allocate_id(),
            label: label.to_string(),
            out_v: from.clone(),
            in_v: to.clone(),
            properties: properties.clone(),
        };
        let rendered = edge_json(&edge);
        self.edges.push(edge);
        Ok(rendered)
    }

    fn vertex_label(&self, id: &Value) -> Option<&str> {
        self.vertices
            .iter()
            .find(|v| &v.id == id)
            .map(|v| v.label.as_str())
    }

    fn elements(&self, element: ElementKind) -> Vec<&dyn Element> {
        match element {
            ElementKind::Vertex => self.vertices.iter().map(|v| v as &dyn Element).collect(),
            ElementKind::Edge => self.edges.iter().map(|e| e as &dyn Element).collect(),
        }
    }

    fn evaluate(&mut self, traversal: &Traversal) -> BackendResult<Vec<Value>> {
        let rows = match traversal {
            Traversal::Ping => vec![json!(1)],
            Traversal::VertexLabels => distinct(self.vertices.iter().map(|v| json!(v.label))),
            Traversal::EdgeLabels => distinct(self.edges.iter().map(|e| json!(e.label))),
            Traversal::PropertyKeys {
                element,
                label,
                sample,
            } => distinct(
                self.elements(*element)
                    .into_iter()
                    .filter(|e| e.label() == label)
                    .take(*sample)
                    .flat_map(|e| e.properties().keys().map(|k| json!(k)).collect::<Vec<_>>()),
            ),
            Traversal::PropertyValues {
                element,
                label,
                key,
                sample,
                limit,
            } => {
                let mut values = distinct(
                    self.elements(*element)
                        .into_iter()
                        .filter(|e| e.label() == label)
                        .take(*sample)
                        .filter_map(|e| e.properties().get(key).cloned()),
                );
                values.truncate(*limit);
                values
            }
            Traversal::LabelCount { element, label } => {
                let count = self
                    .elements(*element)
                    .into_iter()
                    .filter(|e| e.label() == label)
                    .count();
                vec![json!(count)]
            }
            Traversal::TotalCount { element } => vec![json!(self.elements(*element).len())],
            Traversal::RelationshipPatterns { limit } => distinct(
                self.edges
                    .iter()
                    .take(*limit)
                    .filter_map(|e| {
                        let from = self.vertex_label(&e.out_v)?;
                        let to = self.vertex_label(&e.in_v)?;
                        Some(json!({"from": from, "to": to, "label": e.label}))
                    })
                    .collect::<Vec<_>>(),
            ),
            Traversal::AddVertex {
                label,
                id,
                properties,
            } => vec![self.add_vertex(label, id.as_ref(), properties)?],
            Traversal::AddEdge {
                label,
                from,
                to,
                properties,
            } => vec![self.add_edge(label, from, to, properties)?],
            Traversal::DropAll => {
                self.vertices.clear();
                self.edges.clear();
                Vec::new()
            }
            Traversal::Raw(_) => {
                return Err(BackendError::Data(
                    "raw Gremlin is not evaluated by the in-memory graph".into(),
                ))
            }
        };
        Ok(rows)
    }
}

fn distinct(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn properties_json(properties: &BTreeMap<String, Value>) -> Value {
    Value::Object(properties.clone().into_iter().collect::<Map<_, _>>())
}

fn vertex_json(v: &Vertex) -> Value {
    json!({"id": v.id, "label": v.label, "properties": properties_json(&v.properties)})
}

fn edge_json(e: &Edge) -> Value {
    json!({
        "id": e.id,
        "label": e.label,
        "outV": e.out_v,
        "inV": e.in_v,
        "properties": properties_json(&e.properties),
    })
}

/// In-memory graph
pub struct MemoryGraph {
    state: RwLock<GraphState>,
    latency: Option<Duration>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            latency: None,
        }
    }

    /// Sleep this long before answering each traversal.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Build a graph from vertex and edge records.
    pub fn from_data(data: &GraphData) -> BackendResult<Self> {
        let mut state = GraphState::default();
        for v in &data.vertices {
            state.add_vertex(&v.label, v.id.as_ref(), &v.properties)?;
        }
        for e in &data.edges {
            state.add_edge(&e.label, &e.from, &e.to, &e.properties)?;
        }
        Ok(Self {
            state: RwLock::new(state),
            latency: None,
        })
    }

    /// Build a graph from a `{"vertices": [...], "edges": [...]}` document.
    pub fn from_json(json: &str) -> BackendResult<Self> {
        let data = GraphData::parse(ImportFormat::GraphSon, json)
            .map_err(|e| BackendError::Data(e.to_string()))?;
        Self::from_data(&data)
    }

    /// Load a graph file; `.csv` files hold vertices only.
    pub fn load(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::GraphSon,
        };
        let data = GraphData::parse(format, &contents)
            .map_err(|e| BackendError::Data(format!("{}: {}", path.display(), e)))?;
        let graph = Self::from_data(&data)?;
        tracing::info!(
            path = %path.display(),
            vertices = data.vertices.len(),
            edges = data.edges.len(),
            "Loaded graph file"
        );
        Ok(graph)
    }

    pub fn vertex_count(&self) -> BackendResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| BackendError::Lock(e.to_string()))?;
        Ok(state.vertices.len())
    }

    pub fn edge_count(&self) -> BackendResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| BackendError::Lock(e.to_string()))?;
        Ok(state.edges.len())
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphClient for MemoryGraph {
    async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Traversal::Raw(script) = traversal {
            return Err(Error::Unsupported(format!(
                "in-memory graph cannot evaluate '{}'",
                script
            )));
        }

        let mut state = self
            .state
            .write()
            .map_err(|e| BackendError::Lock(e.to_string()))?;
        Ok(state.evaluate(traversal)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gremlin_mcp_core::{generate_schema, GraphService, RelationshipPattern, SchemaConfig};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PEOPLE: &str = r#"{
        "vertices": [
            {"id": 1, "label": "person", "properties": {"name": "ann", "status": "active", "age": 31}},
            {"id": 2, "label": "person", "properties": {"name": "bob", "status": "inactive", "age": 42}},
            {"id": 3, "label": "person", "properties": {"name": "cy", "status": "active", "age": 27}},
            {"id": 4, "label": "company", "properties": {"name": "acme"}}
        ],
        "edges": [
            {"label": "worksAt", "from": 1, "to": 4},
            {"label": "worksAt", "from": 2, "to": 4},
            {"label": "worksAt", "from": 3, "to": 4}
        ]
    }"#;

    /// Counts calls on the way through to a memory graph.
    struct Counting {
        graph: MemoryGraph,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GraphClient for Counting {
        async fn execute(&self, traversal: &Traversal) -> Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.graph.execute(traversal).await
        }
    }

    #[tokio::test]
    async fn test_person_company_schema() {
        let graph = MemoryGraph::from_json(PEOPLE).unwrap();
        let schema = generate_schema(&graph, &SchemaConfig::default())
            .await
            .unwrap();

        let person = schema.node("person").unwrap();
        let company = schema.node("company").unwrap();
        assert_eq!(person.count, Some(3));
        assert_eq!(company.count, Some(1));
        assert_eq!(schema.relationship("worksAt").unwrap().count, Some(3));
        assert_eq!(
            schema.relationship_patterns,
            vec![RelationshipPattern::new("person", "worksAt", "company")]
        );

        let status = person.properties.iter().find(|p| p.name == "status").unwrap();
        assert_eq!(
            status.enum_values,
            Some(vec![json!("active"), json!("inactive")])
        );
        assert!(status.value_types.contains("string"));

        let age = person.properties.iter().find(|p| p.name == "age").unwrap();
        assert!(age.value_types.contains("number"));

        // Blacklisted by default, so never sampled.
        let name = person.properties.iter().find(|p| p.name == "name").unwrap();
        assert!(name.value_types.contains("unknown"));
        assert!(!name.is_enum());
    }

    #[tokio::test]
    async fn test_cached_schema_issues_no_traversals() {
        let client = Arc::new(Counting {
            graph: MemoryGraph::from_json(PEOPLE).unwrap(),
            calls: AtomicUsize::new(0),
        });
        let service = GraphService::new(client.clone(), SchemaConfig::default());

        let first = service.schema().await.unwrap();
        let after_first = client.calls.load(Ordering::SeqCst);
        assert!(after_first > 0);

        let second = service.schema().await.unwrap();
        assert_eq!(client.calls.load(Ordering::SeqCst), after_first);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_empty_graph_schema() {
        let graph = MemoryGraph::new();
        let schema = generate_schema(&graph, &SchemaConfig::default())
            .await
            .unwrap();
        assert!(schema.nodes.is_empty());
        assert!(schema.relationships.is_empty());
        assert!(schema.relationship_patterns.is_empty());
    }

    #[tokio::test]
    async fn test_property_values_respect_sample_and_limit() {
        let graph = MemoryGraph::from_json(PEOPLE).unwrap();
        let rows = graph
            .execute(&Traversal::PropertyValues {
                element: ElementKind::Vertex,
                label: "person".into(),
                key: "age".into(),
                sample: 2,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(rows, vec![json!(31), json!(42)]);
    }

    #[tokio::test]
    async fn test_mutations() {
        let graph = MemoryGraph::new();
        let v = graph
            .execute(&Traversal::AddVertex {
                label: "a".into(),
                id: None,
                properties: BTreeMap::new(),
            })
            .await
            .unwrap();
        let id = v[0]["id"].clone();

        let err = graph
            .execute(&Traversal::AddEdge {
                label: "e".into(),
                from: id.clone(),
                to: json!("missing"),
                properties: BTreeMap::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        graph.execute(&Traversal::DropAll).await.unwrap();
        assert_eq!(graph.vertex_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_raw_is_unsupported() {
        let graph = MemoryGraph::new();
        let err = graph
            .execute(&Traversal::Raw("g.V()".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"vertices": [{"id": 1, "label": "a"}, {"id": 1, "label": "b"}]}"#;
        assert!(matches!(
            MemoryGraph::from_json(json),
            Err(BackendError::DuplicateVertex(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(PEOPLE.as_bytes()).unwrap();

        let graph = MemoryGraph::load(file.path()).unwrap();
        assert_eq!(graph.vertex_count().unwrap(), 4);
        assert_eq!(graph.edge_count().unwrap(), 3);
    }
}
