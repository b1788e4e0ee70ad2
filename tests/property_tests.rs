/// Property-based tests using proptest
/// Grouping must partition the flat list, and a reverted move must restore it exactly
use async_trait::async_trait;
use certsync_crm::board::{BoardController, LeadStore, MoveRequest, MoveResult};
use certsync_crm::errors::AppError;
use certsync_crm::models::{Lead, LeadInput};
use certsync_crm::pipeline::{group_by_stage, PipelineStage};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

fn leads_from_stages(stages: &[usize]) -> Vec<Lead> {
    stages
        .iter()
        .enumerate()
        .map(|(i, stage)| Lead {
            id: format!("lead-{}", i),
            name: format!("Cliente {}", i),
            document: None,
            certificate_type: None,
            phone: None,
            email: None,
            origin: None,
            status: PipelineStage::ALL[*stage],
            expiration_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        })
        .collect()
}

fn position_in_input(id: &str) -> usize {
    id.trim_start_matches("lead-").parse().unwrap()
}

/// Store whose status updates always fail.
struct RejectingStore;

#[async_trait]
impl LeadStore for RejectingStore {
    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        Err(AppError::ExternalApiError("offline".to_string()))
    }

    async fn create_lead(&self, _input: &LeadInput) -> Result<Lead, AppError> {
        Err(AppError::ExternalApiError("offline".to_string()))
    }

    async fn update_lead_status(
        &self,
        _lead_id: &str,
        _status: PipelineStage,
    ) -> Result<Lead, AppError> {
        Err(AppError::ExternalApiError("offline".to_string()))
    }
}

proptest! {
    #[test]
    fn grouping_partitions_every_lead_once(stages in prop::collection::vec(0usize..5, 0..40)) {
        let leads = leads_from_stages(&stages);
        let grouping = group_by_stage(&leads);

        prop_assert_eq!(grouping.len(), leads.len());
        for lead in &leads {
            let column = grouping.column(lead.status);
            prop_assert_eq!(column.iter().filter(|l| l.id == lead.id).count(), 1);
        }
        for (stage, column) in grouping.iter() {
            prop_assert!(column.iter().all(|l| l.status == stage));
        }
    }

    #[test]
    fn grouping_preserves_input_order(stages in prop::collection::vec(0usize..5, 0..40)) {
        let leads = leads_from_stages(&stages);
        let grouping = group_by_stage(&leads);

        for (_, column) in grouping.iter() {
            let positions: Vec<usize> = column.iter().map(|l| position_in_input(&l.id)).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn optimistic_move_keeps_every_card(
        stages in prop::collection::vec(0usize..5, 1..30),
        pick in any::<prop::sample::Index>(),
        destination in 0usize..5,
        destination_index in 0usize..40,
    ) {
        let leads = leads_from_stages(&stages);
        let moved = &leads[pick.index(leads.len())];
        let mut board = BoardController::new(leads.clone());
        let (source, source_index) = board.grouping().position_of(&moved.id).unwrap();
        let destination = PipelineStage::ALL[destination];

        let request = MoveRequest {
            lead_id: moved.id.clone(),
            source,
            source_index,
            destination,
            destination_index,
        };
        board.begin_move(&request).unwrap();

        prop_assert_eq!(board.grouping().len(), leads.len());
        let (stage, index) = board.grouping().position_of(&moved.id).unwrap();
        prop_assert_eq!(stage, destination);
        prop_assert_eq!(board.grouping().column(stage)[index].status, destination);
        if !request.is_noop() {
            let expected = destination_index.min(board.grouping().column(destination).len() - 1);
            prop_assert_eq!(index, expected);
        }
    }

    #[test]
    fn failed_move_restores_grouping_exactly(
        stages in prop::collection::vec(0usize..5, 1..30),
        pick in any::<prop::sample::Index>(),
        destination in 0usize..5,
        destination_index in 0usize..40,
    ) {
        let leads = leads_from_stages(&stages);
        let moved = &leads[pick.index(leads.len())];
        let mut board = BoardController::new(leads.clone());
        let (source, source_index) = board.grouping().position_of(&moved.id).unwrap();

        let request = MoveRequest {
            lead_id: moved.id.clone(),
            source,
            source_index,
            destination: PipelineStage::ALL[destination],
            destination_index,
        };
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(board.move_lead(&RejectingStore, &request)).unwrap();

        if request.is_noop() {
            prop_assert_eq!(result, MoveResult::Unchanged);
        } else {
            prop_assert!(matches!(result, MoveResult::Reverted(_)), "expected revert");
        }
        prop_assert_eq!(board.grouping(), &group_by_stage(&leads));
        prop_assert_eq!(board.leads(), leads.as_slice());
    }
}
