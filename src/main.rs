use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use delibseg::{
    build_bill_pool, infer_meeting_id, load_meeting_file, process_meeting,
    select_trigger_candidates, AnthropicClient, AnthropicConfig, BatchConfig, BatchOrchestrator,
    CandidateConfig, ConsensusConfig, ConsensusController,
};

#[derive(Parser)]
#[command(name = "delibseg")]
#[command(author, version, about = "Committee meeting deliberation segmentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment every meeting file under an input root
    Batch {
        /// Directory scanned recursively for speeches_meeting_<ID>.json
        #[arg(long)]
        input_root: PathBuf,

        /// Directory for annotated outputs (summaries go to <dir>/summary)
        #[arg(long)]
        output_dir: PathBuf,

        /// Only process these meeting IDs (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Option<Vec<String>>,

        #[command(flatten)]
        consensus: ConsensusArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Segment a single meeting file
    Meeting {
        /// Input meeting file (JSON array of speech records)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for annotated speeches (JSON)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        consensus: ConsensusArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the bill pool and trigger candidates without calling the oracle
    Inspect {
        /// Input meeting file (JSON array of speech records)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args)]
struct ConsensusArgs {
    /// Occurrences a segmentation needs before it is accepted
    #[arg(long, default_value = "3")]
    threshold: usize,

    /// Attempts in the primary phase
    #[arg(long, default_value = "10")]
    max_attempts: usize,

    /// Extra attempts when the primary phase does not converge (0 disables)
    #[arg(long, default_value = "15")]
    escalation_attempts: usize,

    /// Upper bound on a single oracle call, in seconds
    #[arg(long, default_value = "1500")]
    oracle_timeout_secs: u64,

    /// Model used for classification
    #[arg(long)]
    model: Option<String>,
}

impl ConsensusArgs {
    fn consensus_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            majority_threshold: self.threshold,
            max_attempts: self.max_attempts,
            escalation_attempts: self.escalation_attempts,
            oracle_timeout: Duration::from_secs(self.oracle_timeout_secs),
            candidates: CandidateConfig::default(),
        }
    }

    fn client(&self) -> Result<AnthropicClient> {
        let mut config = AnthropicConfig::from_env()?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        AnthropicClient::new(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Batch {
            input_root,
            output_dir,
            only,
            consensus,
            verbose,
        } => {
            setup_logging(verbose);
            run_batch(input_root, output_dir, only, consensus).await
        }
        Commands::Meeting {
            input,
            output,
            consensus,
            verbose,
        } => {
            setup_logging(verbose);
            run_meeting(input, output, consensus).await
        }
        Commands::Inspect { input, verbose } => {
            setup_logging(verbose);
            inspect_meeting(input)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

async fn run_batch(
    input_root: PathBuf,
    output_dir: PathBuf,
    only: Option<Vec<String>>,
    consensus: ConsensusArgs,
) -> Result<()> {
    let client = consensus.client()?;

    let mut config = BatchConfig::new(input_root, output_dir);
    config.only = only.map(|ids| {
        ids.into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    });

    let orchestrator = BatchOrchestrator::new(config, consensus.consensus_config());
    let summary = orchestrator.run(&client).await?;

    println!(
        "{} meetings: {} stabilized, {} after escalation, {} failed",
        summary.total, summary.stabilized, summary.retry_stabilized, summary.failed
    );
    if !summary.failed_meetings.is_empty() {
        println!("Failed: {}", summary.failed_meetings.join(","));
    }
    Ok(())
}

async fn run_meeting(input: PathBuf, output: PathBuf, consensus: ConsensusArgs) -> Result<()> {
    let defaults = BatchConfig::default();
    let meeting_id = infer_meeting_id(&input, &defaults.input_prefix);

    info!("Loading meeting {} from {:?}", meeting_id, input);
    let meeting =
        load_meeting_file(&input, &meeting_id).context("Failed to load input meeting")?;
    info!("Loaded {} speeches", meeting.speeches.len());

    let client = consensus.client()?;
    let controller = ConsensusController::new(consensus.consensus_config());
    let summary_path =
        output.with_file_name(format!("{}{}.txt", defaults.summary_prefix, meeting_id));

    let result = process_meeting(&controller, &client, &meeting, &output, &summary_path).await;

    println!(
        "Meeting {}: {} after {} attempts",
        result.meeting_id, result.status, result.attempts
    );
    if let Some(failure) = &result.failure {
        println!("Failure: {}", failure);
    }
    println!("Summary: {:?}", summary_path);
    if let Some(path) = &result.output_path {
        println!("Output: {:?}", path);
    }
    result.ensure_success()
}

fn inspect_meeting(input: PathBuf) -> Result<()> {
    let defaults = BatchConfig::default();
    let meeting_id = infer_meeting_id(&input, &defaults.input_prefix);
    let meeting =
        load_meeting_file(&input, &meeting_id).context("Failed to load input meeting")?;
    let config = CandidateConfig::default();

    println!("Meeting {}", meeting.meeting_id);
    println!("==============");
    println!("Speeches: {}", meeting.speeches.len());
    println!("Max order: {}", meeting.max_order());
    println!(
        "Chair speeches: {}",
        meeting.chair_speeches(&config.chair_marker).len()
    );
    println!();

    println!("Bill Pool");
    println!("---------");
    match build_bill_pool(&meeting) {
        Ok(pool) => {
            for line in pool.lines() {
                println!("{}", line);
            }
        }
        Err(e) => println!("(none: {})", e),
    }
    println!();

    println!("Trigger Candidates");
    println!("------------------");
    match select_trigger_candidates(&meeting, &config) {
        Ok(candidates) => {
            for speech in candidates {
                println!("[{}] {}: {}", speech.order, speech.speaker_name, speech.excerpt(100));
            }
        }
        Err(e) => println!("(none: {})", e),
    }

    Ok(())
}
