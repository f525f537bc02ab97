use llm::chat::StructuredOutputFormat;
use schemars::generate::SchemaSettings;
use serde_json::Value;

use crate::parse::AnalysisPayload;
use crate::ReviewError;

pub const FORMAT_NAME: &str = "analysis_result";

/// JSON schema of the expected response, with subschemas inlined since not
/// every provider resolves `$ref`.
pub fn response_schema() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<AnalysisPayload>();
    serde_json::to_value(schema).unwrap_or_default()
}

/// Structured-output contract handed to the LLM client.
pub fn response_format() -> Result<StructuredOutputFormat, ReviewError> {
    let format = serde_json::json!({
        "name": FORMAT_NAME,
        "description": "Code review of a Power Platform solution",
        "schema": response_schema(),
        "strict": false,
    });
    serde_json::from_value(format).map_err(|e| ReviewError::Build(format!("response schema: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(value: &Value) -> Vec<&str> {
        let mut keys: Vec<&str> = value["required"]
            .as_array()
            .expect("required array")
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn top_level_keys_are_required() {
        let schema = response_schema();
        assert_eq!(
            required(&schema),
            vec!["issues", "optimizedCode", "score", "summary"]
        );
        assert_eq!(schema["properties"]["score"]["type"], "number");
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn issue_schema_is_inlined_and_snippet_optional() {
        let schema = response_schema();
        let issue = &schema["properties"]["issues"]["items"];
        assert!(issue.get("$ref").is_none());
        assert_eq!(
            required(issue),
            vec!["category", "description", "id", "recommendation", "severity", "title"]
        );
        assert_eq!(issue["properties"]["snippet"]["type"], "string");
    }

    #[test]
    fn format_carries_the_schema() {
        let format = response_format().unwrap();
        let debug = format!("{format:?}");
        assert!(debug.contains(FORMAT_NAME));
        assert!(debug.contains("optimizedCode"));
    }
}
