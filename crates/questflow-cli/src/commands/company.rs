//! `questflow company`: run the URL → company profile pipeline once.

use anyhow::Result;
use clap::Args;
use questflow_core::CancellationToken;
use questflow_model::{CompanyInput, WorkflowResult};
use questflow_workflows::Ports;

use super::article::AppTagArg;

/// Run the company workflow for a single source URL.
#[derive(Args)]
pub struct CompanyArgs {
    /// Source URL to research.
    pub url: String,

    /// Category used for ambiguity keyword-coverage scoring.
    #[arg(long)]
    pub category: String,

    /// App this profile is scoped to.
    #[arg(long, value_enum, default_value = "placement")]
    pub app_tag: AppTagArg,

    /// Restrict research to this jurisdiction.
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Replace an existing record for the same slug instead of failing.
    #[arg(long)]
    pub force_update: bool,
}

pub async fn run(args: CompanyArgs, ports: &Ports) -> Result<()> {
    let mut input = CompanyInput::try_new(args.url, args.category, args.app_tag.into())?;
    input.jurisdiction = args.jurisdiction;
    input.force_update = args.force_update;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = questflow_workflows::run_company_workflow(ports, input, &cancel).await;
    ctrl_c.abort();
    print_result(&result)
}

fn print_result(result: &WorkflowResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
