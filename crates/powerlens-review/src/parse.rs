use std::collections::HashSet;

use powerlens_core::{AnalysisIssue, AnalysisResult, IssueCategory, Severity};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};

use crate::ReviewError;

/// Response shape requested from the model. Also the source of the JSON schema.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalysisPayload {
    /// Short overall assessment of the code.
    pub summary: String,
    /// Overall health score from 0 (broken) to 100 (exemplary).
    #[serde(deserialize_with = "lenient_number")]
    #[schemars(with = "f64")]
    pub score: f64,
    pub issues: Vec<IssuePayload>,
    /// Optimized version of the submitted code.
    pub optimized_code: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct IssuePayload {
    pub id: String,
    /// One of: Logic, Performance, Best Practice, Security, Accessibility.
    pub category: String,
    /// One of: Critical, Warning, Info.
    pub severity: String,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    /// The affected code, quoted from the input.
    #[serde(default)]
    #[schemars(with = "String")]
    pub snippet: Option<String>,
}

fn lenient_number<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(f64),
        Str(String),
    }

    match NumOrStr::deserialize(de)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("score is not a number: {s:?}"))),
    }
}

/// Parse raw LLM output into an [`AnalysisResult`].
///
/// Every balanced `{...}` span is tried in order of appearance, so braces in
/// prose before or after the payload do not hide it.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, ReviewError> {
    let mut last_err = None;
    for candidate in json_objects(raw) {
        match serde_json::from_str::<AnalysisPayload>(candidate) {
            Ok(payload) => return Ok(normalize(payload)),
            Err(e) => last_err = Some(e.to_string()),
        }
    }
    Err(ReviewError::InvalidResponse(
        last_err.unwrap_or_else(|| "no JSON object in response".to_string()),
    ))
}

/// All balanced object spans, one per opening brace, in order of appearance.
fn json_objects(raw: &str) -> impl Iterator<Item = &str> {
    raw.match_indices('{')
        .filter_map(move |(start, _)| balanced_object(raw, start))
}

/// Scan from the `{` at `start` to its matching `}`, skipping string literals.
fn balanced_object(raw: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn normalize(payload: AnalysisPayload) -> AnalysisResult {
    let mut seen: HashSet<String> = HashSet::new();
    let issues = payload
        .issues
        .into_iter()
        .enumerate()
        .map(|(n, issue)| {
            let mut id = issue.id.trim().to_string();
            if id.is_empty() || seen.contains(&id) {
                let mut k = n + 1;
                id = format!("issue-{k}");
                while seen.contains(&id) {
                    k += 1;
                    id = format!("issue-{k}");
                }
            }
            seen.insert(id.clone());

            AnalysisIssue {
                id,
                category: map_category(&issue.category),
                severity: map_severity(&issue.severity),
                title: issue.title,
                description: issue.description,
                recommendation: issue.recommendation,
                snippet: issue.snippet.filter(|s| !s.trim().is_empty()),
            }
        })
        .collect();

    AnalysisResult {
        summary: payload.summary,
        score: clamp_score(payload.score),
        issues,
        optimized_code: payload.optimized_code,
    }
}

fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// Lowercase and drop separators, so "Best Practice", "best_practice"
/// and "BestPractice" compare equal.
fn squash(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn map_category(label: &str) -> IssueCategory {
    match squash(label).as_str() {
        "logic" | "logicerror" | "correctness" | "bug" => IssueCategory::Logic,
        "performance" | "perf" => IssueCategory::Performance,
        "bestpractice" | "bestpractices" | "maintainability" | "style" => {
            IssueCategory::BestPractice
        }
        "security" => IssueCategory::Security,
        "accessibility" | "a11y" => IssueCategory::Accessibility,
        _ => {
            tracing::warn!("unknown issue category {label:?}, using Best Practice");
            IssueCategory::BestPractice
        }
    }
}

fn map_severity(label: &str) -> Severity {
    match squash(label).as_str() {
        "critical" | "high" | "error" | "blocker" => Severity::Critical,
        "warning" | "warn" | "medium" | "moderate" => Severity::Warning,
        "info" | "information" | "low" | "suggestion" => Severity::Info,
        _ => {
            tracing::warn!("unknown issue severity {label:?}, using Info");
            Severity::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "summary": "The formula works but is not delegable.",
        "score": 72,
        "issues": [
            {
                "id": "perf-1",
                "category": "Performance",
                "severity": "Warning",
                "title": "Non-delegable Search",
                "description": "Search() is not delegable to SharePoint.",
                "recommendation": "Use StartsWith() instead.",
                "snippet": "Search(Orders, TextInput1.Text, \"Title\")"
            },
            {
                "id": "bp-1",
                "category": "Best Practice",
                "severity": "Info",
                "title": "Hardcoded status",
                "description": "Status literal repeated.",
                "recommendation": "Use a named formula."
            }
        ],
        "optimizedCode": "Filter(Orders, StartsWith(Title, TextInput1.Text))"
    }"#;

    #[test]
    fn parses_a_well_formed_response() {
        let result = parse_analysis(WELL_FORMED).unwrap();
        assert_eq!(result.score, 72);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].category, IssueCategory::Performance);
        assert_eq!(result.issues[0].severity, Severity::Warning);
        assert!(result.issues[0].snippet.is_some());
        assert_eq!(result.issues[1].category, IssueCategory::BestPractice);
        assert_eq!(result.issues[1].snippet, None);
        assert!(result.optimized_code.starts_with("Filter("));
    }

    #[test]
    fn tolerates_code_fences_and_prose() {
        let raw = format!("Here is the review:\n```json\n{WELL_FORMED}\n```\nThanks!");
        let result = parse_analysis(&raw).unwrap();
        assert_eq!(result.summary, "The formula works but is not delegable.");
    }

    #[test]
    fn brace_in_leading_prose_is_skipped() {
        let raw = format!(
            "Your flow's `{{inputs}}` block repeats the connector call.\n```json\n{WELL_FORMED}\n```"
        );
        let result = parse_analysis(&raw).unwrap();
        assert_eq!(result.score, 72);
    }

    #[test]
    fn brace_in_trailing_prose_is_ignored() {
        let raw = format!(
            "```json\n{WELL_FORMED}\n```\nTip: wrap records as {{ Status: \"Active\" }}."
        );
        let result = parse_analysis(&raw).unwrap();
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn braces_inside_string_values_do_not_end_the_object() {
        let raw = r#"Note: { unbalanced
        {"summary":"Use {Status: 1} records","score":90,"issues":[],"optimizedCode":"{ \"a\": \"}\" }"}"#;
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.summary, "Use {Status: 1} records");
        assert_eq!(result.optimized_code, "{ \"a\": \"}\" }");
    }

    #[test]
    fn missing_required_key_is_invalid() {
        let raw = r#"{"summary":"s","score":10,"issues":[]}"#;
        let err = parse_analysis(raw).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidResponse(_)));
        assert!(err.to_string().starts_with("Invalid response format from AI"));
    }

    #[test]
    fn non_json_is_invalid() {
        assert!(matches!(
            parse_analysis("Sorry, I can't help with that."),
            Err(ReviewError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_analysis("} nothing {"),
            Err(ReviewError::InvalidResponse(_))
        ));
    }

    #[test]
    fn score_is_clamped_and_rounded() {
        let base = |score: &str| {
            format!(r#"{{"summary":"s","score":{score},"issues":[],"optimizedCode":""}}"#)
        };
        assert_eq!(parse_analysis(&base("142")).unwrap().score, 100);
        assert_eq!(parse_analysis(&base("-3")).unwrap().score, 0);
        assert_eq!(parse_analysis(&base("87.6")).unwrap().score, 88);
        assert_eq!(parse_analysis(&base("\"65%\"")).unwrap().score, 65);
        assert!(parse_analysis(&base("\"high\"")).is_err());
    }

    #[test]
    fn labels_are_matched_loosely() {
        assert_eq!(map_category("best_practice"), IssueCategory::BestPractice);
        assert_eq!(map_category("BestPractice"), IssueCategory::BestPractice);
        assert_eq!(map_category("SECURITY"), IssueCategory::Security);
        assert_eq!(map_category("a11y"), IssueCategory::Accessibility);
        assert_eq!(map_category("Licensing"), IssueCategory::BestPractice);

        assert_eq!(map_severity("high"), Severity::Critical);
        assert_eq!(map_severity("Medium"), Severity::Warning);
        assert_eq!(map_severity("low"), Severity::Info);
        assert_eq!(map_severity("???"), Severity::Info);
    }

    #[test]
    fn blank_and_duplicate_ids_are_replaced() {
        let raw = r#"{
            "summary": "s", "score": 50, "optimizedCode": "",
            "issues": [
                {"id":"x","category":"Logic","severity":"Critical","title":"a","description":"d","recommendation":"r"},
                {"id":"x","category":"Logic","severity":"Critical","title":"b","description":"d","recommendation":"r"},
                {"id":"  ","category":"Logic","severity":"Critical","title":"c","description":"d","recommendation":"r","snippet":"   "}
            ]
        }"#;
        let result = parse_analysis(raw).unwrap();
        let ids: Vec<&str> = result.issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "issue-2", "issue-3"]);
        assert_eq!(result.issues[2].snippet, None);
    }
}
