use crate::infra::{InMemoryEmployeeDirectory, InMemoryRequisitionGateway};
use chrono::NaiveDate;
use clap::Args;
use reqflow::error::AppError;
use reqflow::workflows::import::{CancelToken, CommitDecision, ImportWorkflow, WorkflowOutcome};
use reqflow::workflows::requisition::{ActingUser, BoardHandle, BoardStage, KanbanBoard};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEMO_FILE: &str = "\
registration;name;title;cost_center;terminated_on;hierarchy\n\
1042;Ana Souza;Analista de RH;CC-10;2026-01-15;H1\n\
1043;Bruno Lima;Coordenador;CC-12;2026-01-22;H2\n\
1044;;Assistente;CC-11;2026-01-20;H1\n\
1045;Clara Nunes;Comprador;CC-14;2026-02-01;H3\n";

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Path to the delimited termination file
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// External ids to treat as already imported
    #[arg(long = "known")]
    pub(crate) known: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional termination file; a built-in sample is used otherwise
    #[arg(long)]
    pub(crate) file: Option<PathBuf>,
    /// Commit with "persist-only" instead of "persist-and-create"
    #[arg(long)]
    pub(crate) persist_only: bool,
}

fn demo_workflow(
    known: &[String],
) -> (
    Arc<ImportWorkflow<InMemoryEmployeeDirectory, InMemoryRequisitionGateway>>,
    Arc<InMemoryRequisitionGateway>,
) {
    let directory = InMemoryEmployeeDirectory::default();
    for (index, id) in known.iter().enumerate() {
        let seeded_on = NaiveDate::from_ymd_opt(2025, 12, 1 + index as u32 % 27)
            .unwrap_or_default();
        directory.seed(id, &format!("previously imported {id}"), seeded_on);
    }

    let gateway = Arc::new(InMemoryRequisitionGateway::default());
    let workflow = Arc::new(ImportWorkflow::new(
        Arc::new(directory),
        Arc::clone(&gateway),
        BoardHandle::new(),
        ActingUser {
            name: "demo-operator".to_string(),
            registration: Some("OP-01".to_string()),
        },
        CancelToken::new(),
        Duration::from_millis(500),
    ));
    (workflow, gateway)
}

fn render_board(board: &KanbanBoard) {
    for stage in BoardStage::ordered() {
        let column = board.column(stage);
        println!("  {:<12} {:>3}", stage.label(), column.len());
        for requisition in column {
            let title = requisition
                .details
                .as_ref()
                .and_then(|details| details.position_title.as_deref())
                .unwrap_or("-");
            println!("    {:<10} {}", requisition.display_key(), title);
        }
    }
}

pub(crate) async fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let file_text = std::fs::read_to_string(&args.file)?;
    let (workflow, _) = demo_workflow(&args.known);

    let outcome = workflow.preview(&file_text).await?;
    let preview = match outcome {
        WorkflowOutcome::Completed(preview) => preview,
        WorkflowOutcome::Cancelled => return Ok(()),
    };

    println!("Preview of {}", args.file.display());
    println!(
        "  {} new record(s), {} already imported",
        preview.new.len(),
        preview.existing.len()
    );
    for record in &preview.new {
        println!("  new      {:<8} {}", record.external_id, record.full_name);
    }
    for existing in &preview.existing {
        println!("  existing {:<8} {}", existing.external_id, existing.full_name);
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let file_text = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEMO_FILE.to_string(),
    };
    let (workflow, gateway) = demo_workflow(&[]);

    println!("Termination import demo");
    let preview = match workflow.preview(&file_text).await? {
        WorkflowOutcome::Completed(preview) => preview,
        WorkflowOutcome::Cancelled => return Ok(()),
    };
    println!(
        "  preview: {} new, {} existing (invalid rows dropped during parsing)",
        preview.new.len(),
        preview.existing.len()
    );

    let decision = if args.persist_only {
        CommitDecision::PersistOnly
    } else {
        CommitDecision::PersistAndCreate
    };
    let receipt = match workflow.commit(decision).await? {
        WorkflowOutcome::Completed(receipt) => receipt,
        WorkflowOutcome::Cancelled => return Ok(()),
    };
    println!(
        "  commit: persisted {}, created {} requisition(s), {} backend record(s) total",
        receipt.persisted,
        receipt.created,
        gateway.persisted_count()
    );

    println!("\nBoard after the optimistic merge");
    render_board(&workflow.board().snapshot());

    if receipt.created > 0 {
        // Wait out the resync delay so the authoritative board lands.
        tokio::time::sleep(Duration::from_millis(700)).await;
        println!("\nBoard after the authoritative resync");
        render_board(&workflow.board().snapshot());
    }

    Ok(())
}
