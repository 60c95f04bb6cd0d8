//! Steps of an order submission.

use serde::{Deserialize, Serialize};

/// A step of the submission protocol, in execution order.
///
/// ```text
/// Admit ─► SaveAddress ─► AllocateId ─► ValidateCatalog ─► WriteOrder
///        ─► ReserveInventory ─► PruneCart ─► PublishEvent
/// ```
///
/// Everything up to and including `ReserveInventory` is blocking: a failure
/// there fails the submission. `PruneCart` and `PublishEvent` are best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStep {
    /// Waiting for an in-flight permit.
    Admit,
    SaveAddress,
    AllocateId,
    ValidateCatalog,
    WriteOrder,
    ReserveInventory,
    PruneCart,
    PublishEvent,
}

impl SubmissionStep {
    /// Returns true if a failure of this step never fails the submission.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, SubmissionStep::PruneCart | SubmissionStep::PublishEvent)
    }

    /// Returns true if a failure of this step leaves a written order that
    /// must be compensated.
    pub fn requires_compensation(&self) -> bool {
        matches!(
            self,
            SubmissionStep::WriteOrder | SubmissionStep::ReserveInventory
        )
    }

    /// Returns the step name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStep::Admit => "admit",
            SubmissionStep::SaveAddress => "save_address",
            SubmissionStep::AllocateId => "allocate_id",
            SubmissionStep::ValidateCatalog => "validate_catalog",
            SubmissionStep::WriteOrder => "write_order",
            SubmissionStep::ReserveInventory => "reserve_inventory",
            SubmissionStep::PruneCart => "prune_cart",
            SubmissionStep::PublishEvent => "publish_event",
        }
    }
}

impl std::fmt::Display for SubmissionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
