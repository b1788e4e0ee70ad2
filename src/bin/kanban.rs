//! Terminal view of the Kanban board, backed by the CRM REST API.
//!
//! ```text
//! kanban                                     # print the board
//! kanban move <lead-id> <stage> [position]   # move a card, then print
//! ```
//!
//! `<stage>` is a stage label ("Agendado") or its column title ("Agendados").

use certsync_crm::api_client::CrmApiClient;
use certsync_crm::board::{BoardController, MoveRequest, MoveResult};
use certsync_crm::config::ClientConfig;
use certsync_crm::pipeline::PipelineStage;
use certsync_crm::reports::{compute_stats, DEFAULT_RENEWAL_WINDOW_DAYS};
use chrono::Utc;
use std::env;

fn parse_stage(raw: &str) -> anyhow::Result<PipelineStage> {
    raw.parse::<PipelineStage>().or_else(|_| {
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.column_title().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown stage '{}'", raw))
    })
}

fn print_board(board: &BoardController) {
    for (stage, leads) in board.grouping().iter() {
        println!("[{}] {} ({})", stage.accent(), stage.column_title(), leads.len());
        for (index, lead) in leads.iter().enumerate() {
            let kind = lead
                .certificate_type
                .map(|t| t.label())
                .unwrap_or("-");
            println!(
                "  {:>2}. {:<5} {}  <{}>  {}",
                index,
                kind,
                lead.name,
                lead.origin.as_deref().unwrap_or("-"),
                lead.id
            );
        }
    }

    let stats = compute_stats(
        board.leads(),
        Utc::now().date_naive(),
        DEFAULT_RENEWAL_WINDOW_DAYS,
    );
    println!(
        "\n{} lead(s), {} aguardando docs, {} agendados, {} emitidos, {} renovações em 365d",
        stats.total_leads, stats.pending_docs, stats.scheduled, stats.issued, stats.renewals_soon
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certsync_crm=info".into()),
        )
        .init();

    let config = ClientConfig::from_env()?;
    let client = CrmApiClient::new(config.api_url.clone())?;
    let mut board = BoardController::load(&client).await;

    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("move") {
        let lead_id = args
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("usage: kanban move <lead-id> <stage> [position]"))?;
        let destination = parse_stage(
            args.get(2)
                .ok_or_else(|| anyhow::anyhow!("missing destination stage"))?,
        )?;
        let (source, source_index) = board
            .grouping()
            .position_of(lead_id)
            .ok_or_else(|| anyhow::anyhow!("lead {} is not on the board", lead_id))?;
        let destination_index = match args.get(3) {
            Some(raw) => raw.parse()?,
            None => usize::MAX,
        };

        let request = MoveRequest {
            lead_id: lead_id.clone(),
            source,
            source_index,
            destination,
            destination_index,
        };
        match board.move_lead(&client, &request).await? {
            MoveResult::Unchanged => println!("Nothing to move."),
            MoveResult::Committed => println!("Moved to {}.\n", destination),
            MoveResult::Reverted(notice) => {
                eprintln!("{} ({})\n", notice.message(), notice.reason)
            }
        }
    }

    print_board(&board);
    Ok(())
}
