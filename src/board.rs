//! Kanban board controller.
//!
//! Holds the flat lead list and the per-stage grouping derived from it, and
//! applies card moves optimistically: the grouping changes synchronously,
//! the status update is sent to the [`LeadStore`], and the outcome is then
//! reconciled. A successful commit refreshes the list from the store; a
//! failed one regroups from the list as it was before the move.
//!
//! A move is split in three steps so the remote call never holds the board:
//!
//! ```text
//! begin_move (sync) -> PendingCommit::commit (async, store only) -> settle
//! ```
//!
//! Several moves may be in flight at once. No ordering is enforced between
//! their commits.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{Lead, LeadInput};
use crate::pipeline::{group_by_stage, BoardGrouping, PipelineStage};

/// Persistent source of leads the board reads from and writes status changes to.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// All leads, newest first.
    async fn list_leads(&self) -> Result<Vec<Lead>, AppError>;

    async fn create_lead(&self, input: &LeadInput) -> Result<Lead, AppError>;

    /// Persists a stage change. Unknown ids yield [`AppError::NotFound`].
    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: PipelineStage,
    ) -> Result<Lead, AppError>;
}

/// A drag-and-drop gesture: card at `source[source_index]` dropped at
/// `destination[destination_index]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub lead_id: String,
    pub source: PipelineStage,
    pub source_index: usize,
    pub destination: PipelineStage,
    pub destination_index: usize,
}

impl MoveRequest {
    /// Dropped exactly where it was picked up.
    pub fn is_noop(&self) -> bool {
        self.source == self.destination && self.source_index == self.destination_index
    }
}

/// Precondition violations of a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The card at `stage[index]` is not `lead_id` (or the slot is empty).
    LeadNotAtSource {
        lead_id: String,
        stage: PipelineStage,
        index: usize,
    },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::LeadNotAtSource {
                lead_id,
                stage,
                index,
            } => write!(f, "lead {} is not at {}[{}]", lead_id, stage, index),
        }
    }
}

impl std::error::Error for BoardError {}

/// An optimistic move waiting for the store to confirm it.
#[derive(Debug, Clone)]
pub struct PendingCommit {
    lead_id: String,
    destination: PipelineStage,
    snapshot: Arc<Vec<Lead>>,
}

impl PendingCommit {
    pub fn lead_id(&self) -> &str {
        &self.lead_id
    }

    pub fn destination(&self) -> PipelineStage {
        self.destination
    }

    /// Sends the status update. Not retried and not cancellable.
    pub async fn commit<S: LeadStore>(self, store: &S) -> CommitOutcome {
        match store
            .update_lead_status(&self.lead_id, self.destination)
            .await
        {
            Ok(lead) => CommitOutcome::Committed {
                pending: self,
                lead,
            },
            Err(error) => CommitOutcome::Failed {
                pending: self,
                error,
            },
        }
    }
}

/// Result of [`PendingCommit::commit`], consumed by [`BoardController::settle`].
#[derive(Debug)]
pub enum CommitOutcome {
    Committed { pending: PendingCommit, lead: Lead },
    Failed { pending: PendingCommit, error: AppError },
}

/// Shown to the user when a move had to be undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    pub lead_id: String,
    /// Underlying error, for logs and details views.
    pub reason: String,
}

impl FailureNotice {
    pub const MESSAGE: &'static str =
        "Erro ao atualizar status. O lead voltou para a coluna original.";

    pub fn message(&self) -> &'static str {
        Self::MESSAGE
    }
}

/// How a move ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Dropped on its own slot; nothing was sent.
    Unchanged,
    /// The store accepted the new status.
    Committed,
    /// The store rejected the update and the board was restored.
    Reverted(FailureNotice),
}

/// Board state: the flat list (source of truth) and its grouping.
#[derive(Debug, Clone, Default)]
pub struct BoardController {
    leads: Arc<Vec<Lead>>,
    grouping: BoardGrouping,
}

impl BoardController {
    pub fn new(leads: Vec<Lead>) -> Self {
        let grouping = group_by_stage(&leads);
        Self {
            leads: Arc::new(leads),
            grouping,
        }
    }

    /// Loads the initial list from the store.
    ///
    /// A failed fetch is logged and yields an empty board; a later
    /// [`refresh`](Self::refresh) can fill it.
    pub async fn load<S: LeadStore>(store: &S) -> Self {
        let mut board = Self::default();
        if board.refresh(store).await {
            tracing::info!("Board loaded with {} lead(s)", board.leads.len());
        }
        board
    }

    /// Last known-good flat list.
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    /// What the board currently shows, including unconfirmed moves.
    pub fn grouping(&self) -> &BoardGrouping {
        &self.grouping
    }

    /// Adopts a new flat list, e.g. after a lead was created elsewhere.
    pub fn replace_leads(&mut self, leads: Vec<Lead>) {
        self.grouping = group_by_stage(&leads);
        self.leads = Arc::new(leads);
    }

    /// Re-fetches the flat list. On failure the board keeps its current state.
    pub async fn refresh<S: LeadStore>(&mut self, store: &S) -> bool {
        match store.list_leads().await {
            Ok(leads) => {
                tracing::debug!("Board refreshed with {} lead(s)", leads.len());
                self.replace_leads(leads);
                true
            }
            Err(e) => {
                tracing::error!("Error fetching leads: {}", e);
                false
            }
        }
    }

    /// Creates a lead through the store and refreshes the board.
    pub async fn create_lead<S: LeadStore>(
        &mut self,
        store: &S,
        input: &LeadInput,
    ) -> Result<Lead, AppError> {
        let lead = store.create_lead(input).await?;
        tracing::info!("Lead {} created in {}", lead.id, lead.status);
        self.refresh(store).await;
        Ok(lead)
    }

    /// Optimistic phase of a move. Returns `None` for a drop on the same slot.
    ///
    /// The grouping is updated before this returns; the flat list is not
    /// touched until the commit settles.
    pub fn begin_move(&mut self, request: &MoveRequest) -> Result<Option<PendingCommit>, BoardError> {
        if request.is_noop() {
            return Ok(None);
        }

        let at_source = self
            .grouping
            .column(request.source)
            .get(request.source_index)
            .is_some_and(|lead| lead.id == request.lead_id);
        if !at_source {
            tracing::warn!(
                "Rejected move of lead {} from {}[{}]: card not found there",
                request.lead_id,
                request.source,
                request.source_index
            );
            return Err(BoardError::LeadNotAtSource {
                lead_id: request.lead_id.clone(),
                stage: request.source,
                index: request.source_index,
            });
        }

        let moved = self
            .grouping
            .column_mut(request.source)
            .remove(request.source_index);
        let target = self.grouping.column_mut(request.destination);
        let index = request.destination_index.min(target.len());
        target.insert(index, moved.with_status(request.destination));

        tracing::debug!(
            "Lead {} moved {} -> {}[{}] (pending)",
            request.lead_id,
            request.source,
            request.destination,
            index
        );

        Ok(Some(PendingCommit {
            lead_id: request.lead_id.clone(),
            destination: request.destination,
            snapshot: Arc::clone(&self.leads),
        }))
    }

    /// Reconciles the board with the outcome of a commit.
    pub async fn settle<S: LeadStore>(&mut self, store: &S, outcome: CommitOutcome) -> MoveResult {
        match outcome {
            CommitOutcome::Committed { pending, lead } => {
                tracing::info!("Lead {} status updated to {}", lead.id, pending.destination);
                self.refresh(store).await;
                MoveResult::Committed
            }
            CommitOutcome::Failed { pending, error } => {
                tracing::error!("Error updating lead status: {}", error);
                let notice = FailureNotice {
                    lead_id: pending.lead_id,
                    reason: error.to_string(),
                };
                self.grouping = group_by_stage(&pending.snapshot);
                self.leads = pending.snapshot;
                MoveResult::Reverted(notice)
            }
        }
    }

    /// Full move: optimistic update, commit, reconcile.
    pub async fn move_lead<S: LeadStore>(
        &mut self,
        store: &S,
        request: &MoveRequest,
    ) -> Result<MoveResult, BoardError> {
        let Some(pending) = self.begin_move(request)? else {
            return Ok(MoveResult::Unchanged);
        };
        let outcome = pending.commit(store).await;
        Ok(self.settle(store, outcome).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::lead;

    fn ids(leads: &[Lead]) -> Vec<&str> {
        leads.iter().map(|l| l.id.as_str()).collect()
    }

    fn request(
        id: &str,
        source: PipelineStage,
        source_index: usize,
        destination: PipelineStage,
        destination_index: usize,
    ) -> MoveRequest {
        MoveRequest {
            lead_id: id.to_string(),
            source,
            source_index,
            destination,
            destination_index,
        }
    }

    fn board() -> BoardController {
        BoardController::new(vec![
            lead("a", PipelineStage::WaitingDocs),
            lead("b", PipelineStage::WaitingDocs),
            lead("c", PipelineStage::New),
        ])
    }

    #[test]
    fn test_optimistic_move_applies_before_commit() {
        let mut board = board();

        let pending = board
            .begin_move(&request(
                "a",
                PipelineStage::WaitingDocs,
                0,
                PipelineStage::Scheduled,
                0,
            ))
            .unwrap()
            .expect("move should be pending");

        assert_eq!(pending.lead_id(), "a");
        assert_eq!(pending.destination(), PipelineStage::Scheduled);
        let grouping = board.grouping();
        assert_eq!(ids(grouping.column(PipelineStage::WaitingDocs)), vec!["b"]);
        assert_eq!(ids(grouping.column(PipelineStage::Scheduled)), vec!["a"]);
        assert_eq!(
            grouping.column(PipelineStage::Scheduled)[0].status,
            PipelineStage::Scheduled
        );
        // flat list untouched until settled
        assert_eq!(board.leads()[0].status, PipelineStage::WaitingDocs);
    }

    #[test]
    fn test_same_slot_is_noop() {
        let mut board = board();
        let before = board.grouping().clone();

        let pending = board
            .begin_move(&request(
                "b",
                PipelineStage::WaitingDocs,
                1,
                PipelineStage::WaitingDocs,
                1,
            ))
            .unwrap();

        assert!(pending.is_none());
        assert_eq!(board.grouping(), &before);
    }

    #[test]
    fn test_destination_index_past_end_appends() {
        let mut board = board();

        board
            .begin_move(&request(
                "c",
                PipelineStage::New,
                0,
                PipelineStage::WaitingDocs,
                99,
            ))
            .unwrap();

        assert_eq!(
            ids(board.grouping().column(PipelineStage::WaitingDocs)),
            vec!["a", "b", "c"]
        );
        assert!(board.grouping().column(PipelineStage::New).is_empty());
    }

    #[test]
    fn test_reorder_within_column() {
        let mut board = board();

        let pending = board
            .begin_move(&request(
                "a",
                PipelineStage::WaitingDocs,
                0,
                PipelineStage::WaitingDocs,
                1,
            ))
            .unwrap();

        assert!(pending.is_some());
        assert_eq!(
            ids(board.grouping().column(PipelineStage::WaitingDocs)),
            vec!["b", "a"]
        );
    }

    #[test]
    fn test_move_of_card_not_at_source_is_rejected() {
        let mut board = board();
        let before = board.grouping().clone();

        let wrong_index = board.begin_move(&request(
            "a",
            PipelineStage::WaitingDocs,
            1,
            PipelineStage::Lost,
            0,
        ));
        let out_of_range = board.begin_move(&request(
            "a",
            PipelineStage::WaitingDocs,
            7,
            PipelineStage::Lost,
            0,
        ));

        assert_eq!(
            wrong_index.unwrap_err(),
            BoardError::LeadNotAtSource {
                lead_id: "a".to_string(),
                stage: PipelineStage::WaitingDocs,
                index: 1,
            }
        );
        assert!(out_of_range.is_err());
        assert_eq!(board.grouping(), &before);
    }

    #[test]
    fn test_replace_leads_regroups() {
        let mut board = board();
        board.replace_leads(vec![lead("z", PipelineStage::Issued)]);

        assert_eq!(board.grouping().len(), 1);
        assert_eq!(ids(board.grouping().column(PipelineStage::Issued)), vec!["z"]);
        assert_eq!(board.leads().len(), 1);
    }
}
