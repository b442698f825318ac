//! Nested JSON export.

use serde::Serialize;

use crate::errors::ExportError;
use crate::models::{
    Artifact, ArtifactKind, Attachment, Decision, DecisionOption, ExportApproval, ExportComment,
    ExportDataset, ExportMetadata,
};

#[derive(Serialize)]
struct JsonExport<'a> {
    metadata: &'a ExportMetadata,
    decisions: Vec<JsonDecision<'a>>,
}

#[derive(Serialize)]
struct JsonDecision<'a> {
    #[serde(flatten)]
    decision: &'a Decision,
    options: Vec<&'a DecisionOption>,
    comments: Vec<&'a ExportComment>,
    approvals: Vec<&'a ExportApproval>,
    attachments: Vec<&'a Attachment>,
}

/// Builds the JSON artifact: metadata plus one object per decision with its
/// related rows nested as arrays. Empty relations serialize as `[]`.
pub fn build_json(dataset: &ExportDataset) -> Result<Artifact, ExportError> {
    let export = JsonExport {
        metadata: &dataset.metadata,
        decisions: dataset
            .bundles()
            .into_iter()
            .map(|bundle| JsonDecision {
                decision: bundle.decision,
                options: bundle.options,
                comments: bundle.comments,
                approvals: bundle.approvals,
                attachments: bundle.attachments,
            })
            .collect(),
    };

    let bytes = serde_json::to_vec_pretty(&export)?;
    Ok(Artifact::new(ArtifactKind::Json, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dataset::fixtures::*;
    use serde_json::Value;

    fn parse(artifact: &Artifact) -> Value {
        serde_json::from_slice(&artifact.bytes).unwrap()
    }

    #[test]
    fn test_nested_arrays() {
        let dataset = two_decision_dataset();
        let json = parse(&build_json(&dataset).unwrap());

        let decisions = json["decisions"].as_array().unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0]["options"].as_array().unwrap().len(), 2);
        assert_eq!(decisions[0]["comments"].as_array().unwrap().len(), 1);
        assert_eq!(decisions[1]["options"], Value::Array(vec![]));
        assert_eq!(decisions[1]["comments"], Value::Array(vec![]));
        assert_eq!(decisions[1]["approvals"], Value::Array(vec![]));
        assert_eq!(decisions[1]["attachments"], Value::Array(vec![]));
    }

    #[test]
    fn test_decision_fields_are_flattened() {
        let dataset = two_decision_dataset();
        let json = parse(&build_json(&dataset).unwrap());

        let first = &json["decisions"][0];
        assert_eq!(first["title"], "Pick a logo");
        assert_eq!(first["id"], dataset.decisions[0].id.to_string());
        assert!(first["description"].is_null());
        assert_eq!(first["options"][0]["isRecommended"], true);
        assert_eq!(first["comments"][0]["authorName"], "Dana Reviewer");
    }

    #[test]
    fn test_metadata() {
        let json = parse(&build_json(&two_decision_dataset()).unwrap());
        assert_eq!(json["metadata"]["jobId"], "export_test");
        assert_eq!(json["metadata"]["version"], "1.0");
        assert_eq!(json["metadata"]["format"], "JSON");
    }

    #[test]
    fn test_two_space_indentation() {
        let artifact = build_json(&two_decision_dataset()).unwrap();
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.starts_with("{\n  \"metadata\": {\n    \""));
    }
}
