//! Printable HTML export, used as the PDF source document.
//!
//! All user-supplied text is escaped before interpolation. Branding can
//! replace the header logo and the heading accent color.

use chrono::{DateTime, Utc};

use crate::models::{Artifact, ArtifactKind, Branding, DecisionBundle, ExportDataset};

const NONE_PLACEHOLDER: &str = "<p class=\"none\">None</p>";

/// Builds the HTML artifact for a dataset.
pub fn build_html(dataset: &ExportDataset, branding: Option<&Branding>) -> Artifact {
    let default_branding = Branding::default();
    let branding = branding.unwrap_or(&default_branding);
    let accent = branding.accent_color();

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n<title>Decision Log Export</title>\n");
    html.push_str(&format!("<style>\n{}</style>\n", stylesheet(accent)));
    html.push_str("</head>\n<body>\n");

    html.push_str("<header class=\"export-header\">\n");
    if let Some(logo) = branding.logo() {
        html.push_str(&format!(
            "<img class=\"logo\" src=\"{}\" alt=\"Logo\">\n",
            escape_html(logo)
        ));
    }
    html.push_str(&format!(
        "<div>\n<h1>Decision Log</h1>\n<p class=\"meta\">Exported {} &middot; {} decision(s) &middot; Job {}</p>\n</div>\n",
        format_timestamp(&dataset.metadata.exported_at),
        dataset.decisions.len(),
        escape_html(&dataset.metadata.job_id),
    ));
    html.push_str("</header>\n");

    for bundle in dataset.bundles() {
        push_decision(&mut html, &bundle);
    }

    html.push_str("</body>\n</html>\n");
    Artifact::new(ArtifactKind::Html, html)
}

fn push_decision(html: &mut String, bundle: &DecisionBundle<'_>) {
    let decision = bundle.decision;

    html.push_str("<section class=\"decision\">\n");
    html.push_str(&format!("<h2>{}</h2>\n", escape_html(&decision.title)));

    let mut meta = format!(
        "Status: {} &middot; Created: {} &middot; Updated: {}",
        escape_html(&decision.status),
        format_timestamp(&decision.created_at),
        format_timestamp(&decision.updated_at),
    );
    if let Some(due) = &decision.due_date {
        meta.push_str(&format!(" &middot; Due: {}", format_timestamp(due)));
    }
    html.push_str(&format!("<p class=\"meta\">{}</p>\n", meta));

    if let Some(description) = &decision.description {
        html.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            escape_html(description)
        ));
    }

    html.push_str("<h3>Options</h3>\n");
    if bundle.options.is_empty() {
        html.push_str(NONE_PLACEHOLDER);
        html.push('\n');
    } else {
        html.push_str("<table>\n<thead><tr><th>#</th><th>Option</th><th>Description</th><th>Recommended</th></tr></thead>\n<tbody>\n");
        for option in &bundle.options {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                option.position,
                escape_html(&option.title),
                escape_html(option.description.as_deref().unwrap_or("")),
                if option.is_recommended { "Yes" } else { "" },
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("<h3>Comments</h3>\n");
    if bundle.comments.is_empty() {
        html.push_str(NONE_PLACEHOLDER);
        html.push('\n');
    } else {
        html.push_str("<ul class=\"comments\">\n");
        for comment in &bundle.comments {
            let edited = if comment.edited_at.is_some() {
                " (edited)"
            } else {
                ""
            };
            html.push_str(&format!(
                "<li><strong>{}</strong> <span class=\"meta\">{}{}</span><br>{}</li>\n",
                escape_html(comment.author_name.as_deref().unwrap_or("Unknown")),
                format_timestamp(&comment.created_at),
                edited,
                escape_html(&comment.content),
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("<h3>Approval History</h3>\n");
    if bundle.approvals.is_empty() {
        html.push_str(NONE_PLACEHOLDER);
        html.push('\n');
    } else {
        html.push_str("<ul class=\"approvals\">\n");
        for approval in &bundle.approvals {
            let comment = approval
                .comment
                .as_deref()
                .map(|c| format!("<br><em>{}</em>", escape_html(c)))
                .unwrap_or_default();
            html.push_str(&format!(
                "<li><strong>{}</strong> ({}) &middot; {} &middot; <span class=\"meta\">{}</span>{}</li>\n",
                escape_html(approval.approver_name.as_deref().unwrap_or("Unknown")),
                escape_html(&approval.role),
                escape_html(&approval.status),
                format_timestamp(&approval.created_at),
                comment,
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("<h3>Attachments</h3>\n");
    if bundle.attachments.is_empty() {
        html.push_str(NONE_PLACEHOLDER);
        html.push('\n');
    } else {
        html.push_str("<ul class=\"attachments\">\n");
        for attachment in &bundle.attachments {
            let name = escape_html(&attachment.filename);
            let label = if is_http_url(&attachment.url) {
                format!("<a href=\"{}\">{}</a>", escape_html(&attachment.url), name)
            } else {
                name
            };
            html.push_str(&format!(
                "<li>{} <span class=\"meta\">v{}{}</span></li>\n",
                label,
                attachment.version,
                attachment
                    .mime_type
                    .as_deref()
                    .map(|m| format!(" &middot; {}", escape_html(m)))
                    .unwrap_or_default(),
            ));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("</section>\n");
}

fn stylesheet(accent: &str) -> String {
    format!(
        "body {{ font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; color: #111827; margin: 32px; }}\n\
         .export-header {{ display: flex; align-items: center; gap: 16px; border-bottom: 3px solid {accent}; padding-bottom: 12px; margin-bottom: 24px; }}\n\
         .logo {{ max-height: 48px; }}\n\
         h1, h2, h3 {{ color: {accent}; }}\n\
         h3 {{ font-size: 14px; margin-bottom: 4px; }}\n\
         .decision {{ page-break-inside: avoid; border-bottom: 1px solid #e5e7eb; padding-bottom: 16px; margin-bottom: 16px; }}\n\
         .meta {{ color: #6b7280; font-size: 12px; }}\n\
         .none {{ color: #9ca3af; font-style: italic; }}\n\
         table {{ border-collapse: collapse; width: 100%; font-size: 13px; }}\n\
         th, td {{ border: 1px solid #e5e7eb; padding: 4px 8px; text-align: left; }}\n",
        accent = accent
    )
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Escapes text for interpolation into HTML content or attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
