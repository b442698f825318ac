//! Flat CSV export.
//!
//! One row per decision and related-row index: the i-th option, comment,
//! approval and attachment of a decision share a row, and exhausted lists
//! leave their columns blank. This is a positional zip, not a join.

use chrono::{DateTime, Utc};

use crate::models::{Artifact, ArtifactKind, DecisionBundle, ExportDataset};

const HEADER: [&str; 24] = [
    "Decision ID",
    "Decision Title",
    "Decision Description",
    "Decision Status",
    "Decision Created At",
    "Decision Updated At",
    "Decision Due Date",
    "Option Title",
    "Option Description",
    "Option Position",
    "Option Recommended",
    "Comment Author",
    "Comment Text",
    "Comment Created At",
    "Approver",
    "Approval Role",
    "Approval Status",
    "Approval Date",
    "Approval Comment",
    "Attachment Filename",
    "Attachment URL",
    "Attachment Type",
    "Attachment Version",
    "Project ID",
];

/// Builds the CSV artifact for a dataset.
pub fn build_csv(dataset: &ExportDataset) -> Artifact {
    let mut csv = String::new();

    // UTF-8 BOM for spreadsheet applications
    csv.push('\u{FEFF}');
    push_row(&mut csv, HEADER.iter().map(|h| h.to_string()));

    for bundle in dataset.bundles() {
        for index in 0..bundle.row_count() {
            push_row(&mut csv, row(&bundle, index));
        }
    }

    Artifact::new(ArtifactKind::Csv, csv)
}

fn row(bundle: &DecisionBundle<'_>, index: usize) -> Vec<String> {
    let decision = bundle.decision;
    let option = bundle.options.get(index);
    let comment = bundle.comments.get(index);
    let approval = bundle.approvals.get(index);
    let attachment = bundle.attachments.get(index);

    vec![
        decision.id.to_string(),
        decision.title.clone(),
        decision.description.clone().unwrap_or_default(),
        decision.status.clone(),
        timestamp(&decision.created_at),
        timestamp(&decision.updated_at),
        decision.due_date.as_ref().map(timestamp).unwrap_or_default(),
        option.map(|o| o.title.clone()).unwrap_or_default(),
        option
            .and_then(|o| o.description.clone())
            .unwrap_or_default(),
        option.map(|o| o.position.to_string()).unwrap_or_default(),
        option
            .map(|o| o.is_recommended.to_string())
            .unwrap_or_default(),
        comment
            .and_then(|c| c.author_name.clone())
            .unwrap_or_default(),
        comment.map(|c| c.content.clone()).unwrap_or_default(),
        comment.map(|c| timestamp(&c.created_at)).unwrap_or_default(),
        approval
            .and_then(|a| a.approver_name.clone())
            .unwrap_or_default(),
        approval.map(|a| a.role.clone()).unwrap_or_default(),
        approval.map(|a| a.status.clone()).unwrap_or_default(),
        approval.map(|a| timestamp(&a.created_at)).unwrap_or_default(),
        approval.and_then(|a| a.comment.clone()).unwrap_or_default(),
        attachment.map(|a| a.filename.clone()).unwrap_or_default(),
        attachment.map(|a| a.url.clone()).unwrap_or_default(),
        attachment
            .and_then(|a| a.mime_type.clone())
            .unwrap_or_default(),
        attachment.map(|a| a.version.to_string()).unwrap_or_default(),
        decision.project_id.to_string(),
    ]
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn push_row(csv: &mut String, fields: impl IntoIterator<Item = String>) {
    let line = fields
        .into_iter()
        .map(|field| escape_csv(&field))
        .collect::<Vec<_>>()
        .join(",");
    csv.push_str(&line);
    csv.push('\n');
}

/// Quote-wraps a field, doubling embedded quotes.
pub fn escape_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
