//! One wide summary event per finished run.

use serde_json::json;
use tracing::info;

use crate::collection::{CollectionReport, Termination};
use crate::workflow::WorkflowCompletion;

/// Emits run summaries as single structured log events.
#[derive(Debug, Clone)]
pub struct SummaryEmitter {
    /// Event type for collection runs.
    pub collection_event_type: String,
    /// Event type for workflows.
    pub workflow_event_type: String,
}

impl Default for SummaryEmitter {
    fn default() -> Self {
        Self {
            collection_event_type: "collection.summary".to_string(),
            workflow_event_type: "workflow.summary".to_string(),
        }
    }
}

impl SummaryEmitter {
    /// Creates an emitter with the default event types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the payload for a finished collection run.
    #[must_use]
    pub fn build_collection_payload(report: &CollectionReport, quota: usize) -> serde_json::Value {
        let status = match report.termination {
            Termination::Success => "completed",
            Termination::Aborted(_) => "aborted",
            _ => "partial",
        };
        let mut payload = json!({
            "request_id": report.request_id,
            "status": status,
            "termination": report.termination.to_string(),
            "collected": report.records.len(),
            "quota": quota,
            "iterations": report.iterations,
        });
        if let Termination::Aborted(reason) = &report.termination {
            payload["error"] = json!(reason);
        }
        payload
    }

    /// Builds the payload for a completed workflow.
    #[must_use]
    pub fn build_workflow_payload(
        request_id: &str,
        completion: &WorkflowCompletion,
    ) -> serde_json::Value {
        json!({
            "request_id": request_id,
            "list_count": completion.list_count,
            "list_termination": completion.list_termination.as_ref().map(ToString::to_string),
            "detail_count": completion.detail_count,
            "expected_detail_count": completion.expected_detail_count,
            "skipped_details": completion.expected_detail_count.saturating_sub(completion.detail_count),
            "files": completion.files.len(),
        })
    }

    /// Emits a collection summary.
    pub fn emit_collection(&self, report: &CollectionReport, quota: usize) {
        let payload = Self::build_collection_payload(report, quota);
        info!(event = %self.collection_event_type, payload = %payload, "Collection finished");
    }

    /// Emits a workflow summary.
    pub fn emit_workflow(&self, request_id: &str, completion: &WorkflowCompletion) {
        let payload = Self::build_workflow_payload(request_id, completion);
        info!(event = %self.workflow_event_type, payload = %payload, "Workflow complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use pretty_assertions::assert_eq;

    fn report(termination: Termination) -> CollectionReport {
        CollectionReport {
            request_id: "req_1".to_string(),
            termination,
            records: vec![Record::new().with("name", "Widget")],
            iterations: 2,
            context: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_collection_payload() {
        let payload = SummaryEmitter::build_collection_payload(&report(Termination::Stalled), 10);

        assert_eq!(payload["status"], "partial");
        assert_eq!(payload["termination"], "stalled");
        assert_eq!(payload["collected"], 1);
        assert_eq!(payload["quota"], 10);
        assert!(payload.get("error").is_none());
    }

    #[test]
    fn test_aborted_payload_carries_error() {
        let payload = SummaryEmitter::build_collection_payload(
            &report(Termination::Aborted("disk full".to_string())),
            10,
        );

        assert_eq!(payload["status"], "aborted");
        assert_eq!(payload["error"], "disk full");
    }

    #[test]
    fn test_workflow_payload() {
        let completion = WorkflowCompletion {
            list_count: 12,
            detail_count: 8,
            expected_detail_count: 10,
            details: Vec::new(),
            list_termination: Some(Termination::Success),
            files: Vec::new(),
        };
        let payload = SummaryEmitter::build_workflow_payload("req_2", &completion);

        assert_eq!(payload["skipped_details"], 2);
        assert_eq!(payload["list_termination"], "success");
        assert_eq!(payload["files"], 0);
    }
}
