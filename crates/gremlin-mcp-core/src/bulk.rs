//! Import payload parsing and export rendering

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::traversal::Traversal;

/// Element keys that are structure rather than properties
const ELEMENT_KEYS: &[&str] = &["id", "label", "inV", "outV", "inVLabel", "outVLabel"];

/// Import payload format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    #[default]
    GraphSon,
    Csv,
}

impl FromStr for ImportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "graphson" | "json" => Ok(Self::GraphSon),
            "csv" => Ok(Self::Csv),
            other => Err(Error::InvalidInput(format!("Unknown import format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Traversals submitted together
    pub batch_size: usize,
    /// Drop every vertex before importing
    pub clear_graph: bool,
    /// Parse and check the payload without writing
    pub validate_only: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            clear_graph: false,
            validate_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub label: String,
    #[serde(alias = "outV")]
    pub from: Value,
    #[serde(alias = "inV")]
    pub to: Value,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// Vertices and edges to load into a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub vertices: Vec<VertexRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl GraphData {
    pub fn parse(format: ImportFormat, data: &str) -> Result<Self> {
        let parsed = match format {
            ImportFormat::GraphSon => serde_json::from_str::<GraphData>(data)
                .map_err(|e| Error::InvalidInput(format!("Invalid GraphSON payload: {}", e)))?,
            ImportFormat::Csv => parse_csv(data)?,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, v) in self.vertices.iter().enumerate() {
            if v.label.trim().is_empty() {
                return Err(Error::InvalidInput(format!("Vertex {} has an empty label", i)));
            }
        }
        for (i, e) in self.edges.iter().enumerate() {
            if e.label.trim().is_empty() {
                return Err(Error::InvalidInput(format!("Edge {} has an empty label", i)));
            }
            if e.from.is_null() || e.to.is_null() {
                return Err(Error::InvalidInput(format!("Edge {} is missing an endpoint", i)));
            }
        }
        Ok(())
    }

    /// Vertices first, so edges can reference them.
    pub fn traversals(&self) -> Vec<Traversal> {
        let vertices = self.vertices.iter().map(|v| Traversal::AddVertex {
            label: v.label.clone(),
            id: v.id.clone(),
            properties: v.properties.clone(),
        });
        let edges = self.edges.iter().map(|e| Traversal::AddEdge {
            label: e.label.clone(),
            from: e.from.clone(),
            to: e.to.clone(),
            properties: e.properties.clone(),
        });
        vertices.chain(edges).collect()
    }
}

/// Outcome of an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub vertices: usize,
    pub edges: usize,
    pub batches: usize,
    pub cleared: bool,
    pub validated_only: bool,
}

/// Export output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    GraphSon,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "graphson" => Ok(Self::GraphSon),
            "csv" => Ok(Self::Csv),
            other => Err(Error::InvalidInput(format!("Unknown export format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Keep only these properties
    pub include_properties: Option<Vec<String>>,
    pub exclude_properties: Vec<String>,
}

/// Render traversal results in the requested format.
pub fn render_export(rows: Vec<Value>, options: &ExportOptions) -> Result<String> {
    let rows: Vec<Value> = rows.into_iter().map(|row| filter_row(row, options)).collect();

    match options.format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        ExportFormat::GraphSon => {
            let data = elements_to_graph_data(&rows);
            Ok(serde_json::to_string_pretty(&data)?)
        }
        ExportFormat::Csv => Ok(render_csv(&rows)),
    }
}

fn keep(key: &str, options: &ExportOptions) -> bool {
    if options.exclude_properties.iter().any(|k| k == key) {
        return false;
    }
    match &options.include_properties {
        Some(include) => include.iter().any(|k| k == key),
        None => true,
    }
}

fn filter_map(map: Map<String, Value>, options: &ExportOptions) -> Map<String, Value> {
    map.into_iter().filter(|(k, _)| keep(k, options)).collect()
}

/// Elements are filtered inside `properties`; other maps at the top level.
fn filter_row(row: Value, options: &ExportOptions) -> Value {
    let Value::Object(mut map) = row else {
        return row;
    };
    if is_element(&map) {
        if let Some(Value::Object(props)) = map.remove("properties") {
            map.insert("properties".into(), Value::Object(filter_map(props, options)));
        }
        Value::Object(map)
    } else {
        Value::Object(filter_map(map, options))
    }
}

fn is_element(map: &Map<String, Value>) -> bool {
    map.contains_key("id") && map.contains_key("label")
}

fn elements_to_graph_data(rows: &[Value]) -> GraphData {
    let mut data = GraphData::default();
    for row in rows {
        let Value::Object(map) = row else { continue };
        if !is_element(map) {
            continue;
        }
        let label = map
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let properties: BTreeMap<String, Value> = match map.get("properties") {
            Some(Value::Object(props)) => props.clone().into_iter().collect(),
            _ => BTreeMap::new(),
        };
        match (map.get("outV"), map.get("inV")) {
            (Some(from), Some(to)) => data.edges.push(EdgeRecord {
                label,
                from: from.clone(),
                to: to.clone(),
                properties,
            }),
            _ => data.vertices.push(VertexRecord {
                id: map.get("id").cloned(),
                label,
                properties,
            }),
        }
    }
    data
}

/// Flatten rows to columns; element properties become their own columns.
fn render_csv(rows: &[Value]) -> String {
    let flat: Vec<Vec<(String, Value)>> = rows.iter().map(flatten_row).collect();

    let mut columns: Vec<String> = Vec::new();
    for row in &flat {
        for (key, _) in row {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut output = String::new();
    output.push_str(
        &columns
            .iter()
            .map(|c| csv_escape(c))
            .collect::<Vec<_>>()
            .join(","),
    );
    output.push('\n');

    for row in &flat {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| {
                row.iter()
                    .find(|(k, _)| k == col)
                    .map(|(_, v)| csv_escape(&cell_text(v)))
                    .unwrap_or_default()
            })
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

fn flatten_row(row: &Value) -> Vec<(String, Value)> {
    match row {
        Value::Object(map) => {
            let mut out = Vec::new();
            for (key, value) in map {
                match (key.as_str(), value) {
                    ("properties", Value::Object(props)) => {
                        out.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    _ => out.push((key.clone(), value.clone())),
                }
            }
            out
        }
        other => vec![("value".to_string(), other.clone())],
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escape a string for CSV output with formula injection protection
fn csv_escape(s: &str) -> String {
    // Prefix dangerous chars with ' to prevent spreadsheet interpretation
    let needs_formula_protection = s
        .chars()
        .next()
        .map(|c| matches!(c, '=' | '+' | '-' | '@' | '\t' | '\r'))
        .unwrap_or(false);

    let escaped = if needs_formula_protection {
        format!("'{}", s)
    } else {
        s.to_string()
    };

    if escaped.contains(',') || escaped.contains('"') || escaped.contains('\n') {
        format!("\"{}\"", escaped.replace('"', "\"\""))
    } else {
        escaped
    }
}

/// Parse a CSV document. A header with both `from` and `to` makes it an edge file.
fn parse_csv(data: &str) -> Result<GraphData> {
    let mut records = parse_csv_records(data)?.into_iter();
    let header = records
        .next()
        .ok_or_else(|| Error::InvalidInput("CSV payload is empty".into()))?;

    let position = |name: &str| header.iter().position(|h| h == name);
    let label_col = position("label")
        .ok_or_else(|| Error::InvalidInput("CSV header must contain a 'label' column".into()))?;
    let edge_cols = position("from").zip(position("to"));
    let id_col = position("id");

    let mut graph = GraphData::default();
    for (line, record) in records.enumerate() {
        if record.len() != header.len() {
            return Err(Error::InvalidInput(format!(
                "CSV row {} has {} fields, expected {}",
                line + 2,
                record.len(),
                header.len()
            )));
        }

        let mut properties = BTreeMap::new();
        for (i, cell) in record.iter().enumerate() {
            let structural = i == label_col
                || Some(i) == id_col
                || edge_cols.map_or(false, |(f, t)| i == f || i == t);
            if !structural && !cell.is_empty() {
                properties.insert(header[i].clone(), infer_cell(cell));
            }
        }

        let label = record[label_col].clone();
        match edge_cols {
            Some((from, to)) => graph.edges.push(EdgeRecord {
                label,
                from: infer_cell(&record[from]),
                to: infer_cell(&record[to]),
                properties,
            }),
            None => graph.vertices.push(VertexRecord {
                id: id_col
                    .map(|i| &record[i])
                    .filter(|c| !c.is_empty())
                    .map(|c| infer_cell(c)),
                label,
                properties,
            }),
        }
    }

    Ok(graph)
}

/// Integers, floats and booleans are typed; everything else stays a string.
fn infer_cell(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::from(f);
        }
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "" => Value::Null,
        _ => Value::String(cell.to_string()),
    }
}

fn parse_csv_records(data: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = data.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::InvalidInput("Unterminated quoted CSV field".into()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}
