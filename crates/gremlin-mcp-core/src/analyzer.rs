//! Sampling property analyzer
//!
//! Derives the value types of one property key, and whether it behaves like
//! an enum, from a bounded sample of values. A key missing from the sampled
//! elements is reported as `unknown`; that false negative is accepted.

use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::Result;
use crate::normalize::type_name;
use crate::schema::{Cardinality, Property};
use crate::traversal::{ElementKind, GraphClient, Traversal};

/// Elements of a label whose values are sampled.
pub const VALUE_SAMPLE: usize = 50;

/// Sample values attached to a property when sample inclusion is on.
pub const MAX_SAMPLE_VALUES: usize = 5;

/// Analyze one property key of one label.
///
/// Blacklisted keys short-circuit without touching the database.
pub async fn analyze_property<C: GraphClient + ?Sized>(
    client: &C,
    element: ElementKind,
    label: &str,
    key: &str,
    config: &SchemaConfig,
) -> Result<Property> {
    if config.is_blacklisted(key) {
        return Ok(Property::unknown(key));
    }

    let values = client
        .execute(&value_sample_traversal(element, label, key, config))
        .await?;
    Ok(classify(key, values, config))
}

/// The sampling query for a key.
///
/// Values are capped at `max_enum_values + 1` so that "exactly at the limit"
/// and "more than the limit" stay distinguishable.
pub fn value_sample_traversal(
    element: ElementKind,
    label: &str,
    key: &str,
    config: &SchemaConfig,
) -> Traversal {
    Traversal::PropertyValues {
        element,
        label: label.to_string(),
        key: key.to_string(),
        sample: VALUE_SAMPLE,
        limit: config.max_enum_values + 1,
    }
}

/// Build a property descriptor from sampled values.
pub fn classify(key: &str, values: Vec<Value>, config: &SchemaConfig) -> Property {
    let mut distinct: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }

    if distinct.is_empty() {
        return Property::unknown(key);
    }

    let mut property = Property::unknown(key);
    property.value_types = distinct.iter().map(|v| type_name(v).to_string()).collect();

    if config.include_sample_values {
        property.sample_values = Some(distinct.iter().take(MAX_SAMPLE_VALUES).cloned().collect());
    }

    // Hitting the fetch cap means more values exist than were returned.
    let capped = distinct.len() > config.max_enum_values;
    if config.enum_discovery_enabled && !capped && distinct.len() <= config.enum_cardinality_threshold
    {
        property.cardinality = Some(Cardinality::Single);
        property.enum_values = Some(distinct);
    }

    property
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UNKNOWN_TYPE;
    use crate::testing::ScriptedClient;
    use serde_json::json;

    fn config() -> SchemaConfig {
        SchemaConfig {
            max_enum_values: 10,
            enum_cardinality_threshold: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_blacklisted_key_issues_no_query() {
        let config = config();
        let client = ScriptedClient::new();

        let prop = analyze_property(&client, ElementKind::Vertex, "person", "id", &config)
            .await
            .unwrap();

        assert_eq!(prop, Property::unknown("id"));
        assert_eq!(
            serde_json::to_value(&prop).unwrap(),
            json!({"name": "id", "type": ["unknown"]})
        );
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_status_enum() {
        let config = config();
        let client = ScriptedClient::new().respond(
            value_sample_traversal(ElementKind::Vertex, "person", "status", &config),
            vec![json!("active"), json!("active"), json!("inactive")],
        );

        let prop = analyze_property(&client, ElementKind::Vertex, "person", "status", &config)
            .await
            .unwrap();

        assert_eq!(prop.value_types.iter().collect::<Vec<_>>(), vec!["string"]);
        assert_eq!(prop.enum_values, Some(vec![json!("active"), json!("inactive")]));
        assert_eq!(prop.cardinality, Some(Cardinality::Single));
        assert!(prop.sample_values.is_none());
    }

    #[test]
    fn test_enum_threshold_boundary() {
        let config = config();

        let at_threshold: Vec<Value> = (0..10).map(|i| json!(format!("v{i}"))).collect();
        let prop = classify("code", at_threshold, &config);
        assert_eq!(prop.enum_values.as_ref().map(Vec::len), Some(10));
        assert_eq!(prop.cardinality, Some(Cardinality::Single));

        let over_threshold: Vec<Value> = (0..11).map(|i| json!(format!("v{i}"))).collect();
        let prop = classify("code", over_threshold, &config);
        assert!(prop.enum_values.is_none());
        assert!(prop.cardinality.is_none());
    }

    #[test]
    fn test_capped_sample_is_not_an_enum() {
        // Four values returned for a cap of three means more exist.
        let config = SchemaConfig {
            max_enum_values: 3,
            enum_cardinality_threshold: 10,
            ..Default::default()
        };
        let values = vec![json!(1), json!(2), json!(3), json!(4)];
        assert!(classify("n", values, &config).enum_values.is_none());

        let values = vec![json!(1), json!(2), json!(3)];
        assert!(classify("n", values, &config).is_enum());
    }

    #[test]
    fn test_empty_sample_is_unknown() {
        let prop = classify("missing", vec![], &config());
        assert_eq!(prop.value_types.iter().collect::<Vec<_>>(), vec![UNKNOWN_TYPE]);
        assert!(prop.enum_values.is_none());
    }

    #[test]
    fn test_mixed_types_and_sample_values() {
        let config = SchemaConfig {
            include_sample_values: true,
            enum_discovery_enabled: false,
            ..config()
        };
        let values = vec![json!(1), json!("one"), json!(true), json!(2), json!(3), json!(4)];
        let prop = classify("mixed", values, &config);

        assert_eq!(
            prop.value_types.iter().collect::<Vec<_>>(),
            vec!["boolean", "number", "string"]
        );
        assert_eq!(prop.sample_values.as_ref().map(Vec::len), Some(MAX_SAMPLE_VALUES));
        assert!(prop.enum_values.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let config = config();
        let client = ScriptedClient::new().fail(
            value_sample_traversal(ElementKind::Edge, "worksAt", "since", &config),
            "timeout reading socket",
        );

        let err = analyze_property(&client, ElementKind::Edge, "worksAt", "since", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Connectivity(_)));
    }
}
