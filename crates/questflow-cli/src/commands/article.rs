//! `questflow article`: run the topic → article pipeline once.

use anyhow::Result;
use clap::{Args, ValueEnum};
use questflow_core::CancellationToken;
use questflow_model::{AppTag, ArticleFormat, ArticleInput, WorkflowResult};
use questflow_workflows::Ports;

#[derive(Clone, Copy, ValueEnum)]
pub enum AppTagArg {
    Placement,
    Relocation,
    ChiefOfStaff,
    Consultancy,
}

impl From<AppTagArg> for AppTag {
    fn from(value: AppTagArg) -> Self {
        match value {
            AppTagArg::Placement => AppTag::Placement,
            AppTagArg::Relocation => AppTag::Relocation,
            AppTagArg::ChiefOfStaff => AppTag::ChiefOfStaff,
            AppTagArg::Consultancy => AppTag::Consultancy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ArticleFormatArg {
    Article,
    Listicle,
    Guide,
    Analysis,
}

impl From<ArticleFormatArg> for ArticleFormat {
    fn from(value: ArticleFormatArg) -> Self {
        match value {
            ArticleFormatArg::Article => ArticleFormat::Article,
            ArticleFormatArg::Listicle => ArticleFormat::Listicle,
            ArticleFormatArg::Guide => ArticleFormat::Guide,
            ArticleFormatArg::Analysis => ArticleFormat::Analysis,
        }
    }
}

/// Run the article workflow for a single topic.
#[derive(Args)]
pub struct ArticleArgs {
    /// Subject to write about.
    pub topic: String,

    /// App this article is scoped to.
    #[arg(long, value_enum, default_value = "relocation")]
    pub app_tag: AppTagArg,

    /// Target word count (500-5000). Defaults to 1500 when omitted.
    #[arg(long)]
    pub word_count: Option<u32>,

    /// Requested output shape.
    #[arg(long, value_enum, default_value = "article")]
    pub format: ArticleFormatArg,

    /// Restrict research to this jurisdiction (ISO country code).
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Number of sources to target in research fan-out (3-20).
    #[arg(long, default_value_t = 8)]
    pub research_breadth: u32,

    /// Keywords to bias synthesis toward.
    #[arg(long, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Follow links beyond depth 0 during crawling.
    #[arg(long)]
    pub deep_crawl: bool,

    /// Skip image generation for this run.
    #[arg(long)]
    pub no_images: bool,

    /// Skip the graph-context read and graph sync write.
    #[arg(long)]
    pub skip_graph_sync: bool,
}

pub async fn run(args: ArticleArgs, ports: &Ports) -> Result<()> {
    let mut input =
        ArticleInput::try_new(args.topic, args.app_tag.into(), args.word_count, args.format.into(), args.research_breadth)?;
    input.jurisdiction = args.jurisdiction;
    input.keywords = args.keywords;
    input.flags.deep_crawl = args.deep_crawl;
    input.flags.generate_images = !args.no_images;
    input.flags.skip_graph_sync = args.skip_graph_sync;

    // The entity linker's candidate set is sourced here rather than by a
    // workflow-crate port (see `questflow_workflows::phases::entities`);
    // a real deployment would load this from the company directory store.
    let company_directory = Vec::new();

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = questflow_workflows::run_article_workflow(ports, input, company_directory, &cancel).await;
    ctrl_c.abort();
    print_result(&result)
}

fn print_result(result: &WorkflowResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
