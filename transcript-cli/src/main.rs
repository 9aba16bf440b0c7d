// Transcript CLI - readable chat transcripts from raw agent conversation records
// Reads a task's stored records, rebuilds the chat, and prints or exports it

mod config;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transcript_core::blocks::{ContentBlock, RecordContent, ToolResultPart};
use transcript_core::{
    fetch_transcript, handle_request, visible_blocks, DisplayMessage, FetchError, FetchRequest, MessageFeed, Page,
    RawRecord,
};

use config::{export_writer, SourceArgs};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match &cli.command {
        Command::Render(cmd) => handle_render(cmd)?,
        Command::Raw(cmd) => handle_raw(cmd)?,
        Command::Sync(cmd) => handle_sync(cmd)?,
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser, Debug)]
#[command(
    name = "transcript",
    author,
    version,
    about = "Transcript: readable chat transcripts from raw agent records",
    long_about = "Rebuild the chat transcript of an agent task from its stored LLM conversation records.\nTool invocations and routine tool output are hidden; errors and screenshots are kept."
)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reconstructed transcript of a task
    Render(RenderArgs),
    /// List a task's raw stored records
    Raw(RawArgs),
    /// Append new transcript messages to the plain-text export
    Sync(SyncArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable chat
    Text,
    /// JSON array of display messages
    Json,
    /// Status code and response body, as the messages endpoint returns them
    Response,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Only show messages newer than this record id
    #[arg(short, long)]
    after: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct RawArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Records per page
    #[arg(short, long)]
    limit: Option<usize>,
    /// 1-based page number
    #[arg(short, long)]
    page: Option<usize>,
    /// Only list the blocks a chat view would show
    #[arg(long)]
    visible_only: bool,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Export directory (default: ~/Assistants/transcripts)
    #[arg(short, long, env = "TRANSCRIPT_EXPORT_DIR")]
    output: Option<PathBuf>,
}

fn fetch_request(source: &SourceArgs, after: Option<String>) -> FetchRequest {
    FetchRequest {
        task_id: source.task.clone(),
        last_message_id: after,
    }
}

fn exit_missing_task() -> ! {
    eprintln!("Error: {}. Pass --task <id>.", FetchError::MissingTaskId);
    std::process::exit(2);
}

fn handle_render(args: &RenderArgs) -> Result<()> {
    let feed = args.source.open_feed()?;
    let request = fetch_request(&args.source, args.after.clone());

    if args.format == OutputFormat::Response {
        let (status, body) = handle_request(feed.as_ref(), &request);
        println!("{}", status);
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let transcript = match fetch_transcript(feed.as_ref(), &request) {
        Ok(transcript) => transcript,
        Err(FetchError::MissingTaskId) => exit_missing_task(),
        Err(err) => return Err(err.into()),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&transcript.messages)?),
        _ => {
            for message in &transcript.messages {
                print_message(message);
            }
            if let Some(ref last) = transcript.last_record_id {
                eprintln!("Resume with: --after {}", last);
            }
        }
    }

    Ok(())
}

fn print_message(message: &DisplayMessage) {
    println!("[{}] {}", message.created_at.format("%Y-%m-%d %H:%M:%S"), message.role);
    if !message.content.is_empty() {
        println!("{}", message.content);
    }
    if let Some(ref images) = message.images {
        for image in images {
            println!("  🖼  {} ({} bytes base64)", image.media_type, image.data.len());
        }
    }
    println!();
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisibleRecord<'a> {
    id: &'a str,
    role: &'a str,
    created_at: String,
    blocks: Vec<String>,
}

fn handle_raw(args: &RawArgs) -> Result<()> {
    let Some(ref task_id) = args.source.task else {
        exit_missing_task();
    };

    let feed = args.source.open_feed()?;
    let page = Page::new(args.limit, args.page);
    let records = feed.records(task_id, None, Some(page))?;

    eprintln!(
        "Task {}: page {} ({} records, limit {})",
        task_id,
        page.page,
        records.len(),
        page.limit
    );

    for record in &records {
        if args.visible_only {
            let view = VisibleRecord {
                id: &record.id,
                role: record.role.as_str(),
                created_at: record.created_at.to_rfc3339(),
                blocks: describe_visible(record),
            };
            println!("{}", serde_json::to_string(&view)?);
        } else {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    Ok(())
}

fn describe_visible(record: &RawRecord) -> Vec<String> {
    match RecordContent::classify(&record.content) {
        RecordContent::Plain(text) => vec![format!("text: {}", text)],
        RecordContent::Blocks(blocks) => visible_blocks(&blocks).into_iter().map(describe_block).collect(),
        RecordContent::Unrecognized => Vec::new(),
    }
}

fn describe_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text(text) => format!("text: {}", text.text),
        ContentBlock::Image(image) => format!("image: {}", image.source.media_type.as_deref().unwrap_or("unknown")),
        ContentBlock::ToolUse(tool) => format!("tool_use: {} {}", tool.name, serde_json::Value::Object(tool.input.clone())),
        ContentBlock::ToolResult(result) => {
            let parts: Vec<&str> = result
                .content
                .iter()
                .map(|part| match part {
                    ToolResultPart::Text { .. } => "text",
                    ToolResultPart::Image(_) => "image",
                })
                .collect();
            let status = if result.is_error { "error" } else { "ok" };
            format!("tool_result ({}): {} [{}]", status, result.tool_use_id, parts.join(", "))
        }
    }
}

fn handle_sync(args: &SyncArgs) -> Result<()> {
    let Some(ref task_id) = args.source.task else {
        exit_missing_task();
    };

    let writer = export_writer(args.output.as_ref())?;
    let feed = args.source.open_feed()?;

    let checkpoint = writer.load_checkpoint(task_id)?;
    if let Some(ref id) = checkpoint {
        eprintln!("Resuming task {} after record {}", task_id, id);
    }

    let request = fetch_request(&args.source, checkpoint);
    let transcript = fetch_transcript(feed.as_ref(), &request)?;

    let Some(last_record_id) = transcript.last_record_id else {
        println!("✓ Task {} is up to date", task_id);
        return Ok(());
    };

    let path = writer.append_messages(task_id, &transcript.messages)?;
    let total = writer.message_count(task_id)? + transcript.messages.len() as u64;

    writer.update_task_metadata(
        task_id,
        serde_json::json!({
            "last_record_id": last_record_id,
            "message_count": total,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        }),
    )?;
    info!(task_id = %task_id, last_record_id = %last_record_id, total, "export checkpoint updated");

    println!("✓ Synced {} new messages for task {}", transcript.messages.len(), task_id);
    println!("  Location: {}", path.display());

    Ok(())
}
