//! Data aggregation for exports.
//!
//! Fetches decisions and their related rows for a set of decision ids and
//! joins author and approver display names into an [`ExportDataset`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use super::collaborators::DecisionSource;
use crate::errors::ExportError;
use crate::models::{ExportApproval, ExportComment, ExportDataset, ExportMetadata};

/// Assembles export datasets from a [`DecisionSource`].
pub struct DataAggregator {
    source: Arc<dyn DecisionSource>,
}

impl DataAggregator {
    pub fn new(source: Arc<dyn DecisionSource>) -> Self {
        Self { source }
    }

    /// Builds the dataset for `decision_ids`.
    ///
    /// Child rows are restricted to the decisions actually returned, so the
    /// dataset is always referentially closed. Attachments are only fetched
    /// when `include_attachments` is set.
    pub async fn aggregate(
        &self,
        metadata: ExportMetadata,
        decision_ids: &[Uuid],
        include_attachments: bool,
    ) -> Result<ExportDataset, ExportError> {
        let requested: HashSet<Uuid> = decision_ids.iter().copied().collect();
        let decisions: Vec<_> = self
            .source
            .fetch_decisions(decision_ids)
            .await?
            .into_iter()
            .filter(|d| requested.contains(&d.id))
            .collect();

        let ids: Vec<Uuid> = decisions.iter().map(|d| d.id).collect();
        let id_set: HashSet<Uuid> = ids.iter().copied().collect();

        let (mut options, comments, approvals, attachments) = tokio::try_join!(
            self.source.fetch_options(&ids),
            self.source.fetch_comments(&ids),
            self.source.fetch_approvals(&ids),
            async {
                if include_attachments {
                    self.source.fetch_attachments(&ids).await
                } else {
                    Ok(Vec::new())
                }
            },
        )?;

        options.retain(|o| id_set.contains(&o.decision_id));
        options.sort_by_key(|o| o.position);

        let mut comments: Vec<_> = comments
            .into_iter()
            .filter(|c| id_set.contains(&c.decision_id))
            .collect();
        comments.sort_by_key(|c| c.created_at);

        let mut approvals: Vec<_> = approvals
            .into_iter()
            .filter(|a| id_set.contains(&a.decision_id))
            .collect();
        approvals.sort_by_key(|a| a.created_at);

        let attachments = attachments
            .into_iter()
            .filter(|a| id_set.contains(&a.decision_id))
            .collect();

        let user_ids: Vec<Uuid> = comments
            .iter()
            .filter_map(|c| c.author_id)
            .chain(approvals.iter().filter_map(|a| a.approver_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let names: HashMap<Uuid, String> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            self.source
                .fetch_profiles(&user_ids)
                .await?
                .into_iter()
                .filter_map(|p| p.display_name.map(|name| (p.user_id, name)))
                .collect()
        };
        let resolve = |id: Option<Uuid>| id.and_then(|id| names.get(&id).cloned());

        let comments = comments
            .into_iter()
            .map(|c| ExportComment {
                id: c.id,
                decision_id: c.decision_id,
                author_name: resolve(c.author_id),
                content: c.content,
                created_at: c.created_at,
                edited_at: c.edited_at,
            })
            .collect();

        let approvals = approvals
            .into_iter()
            .map(|a| ExportApproval {
                id: a.id,
                decision_id: a.decision_id,
                approver_name: resolve(a.approver_id),
                role: a.role,
                status: a.status,
                created_at: a.created_at,
                comment: a.comment,
            })
            .collect();

        tracing::debug!(
            job_id = %metadata.job_id,
            decisions = decisions.len(),
            "Aggregated export dataset"
        );

        Ok(ExportDataset {
            metadata,
            decisions,
            options,
            comments,
            approvals,
            attachments,
        })
    }
}
