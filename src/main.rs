use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;

use textpdf::generate::{ChatClient, ContextUsage, context_usage, estimate_tokens};
use textpdf::import::ImporterRegistry;
use textpdf::job::{CancelToken, JobOutcome, RenderJob, RewriteJob};
use textpdf::{Config, PageSpec, Renderer, prompts};

#[derive(Parser)]
#[command(name = "textpdf")]
#[command(about = "Convert text, Markdown, Word or PowerPoint files to PDF, optionally rewriting them first")]
struct Cli {
    /// Input file (.txt, .md, .docx or .pptx)
    input: PathBuf,

    /// Output PDF file (defaults to input name with .pdf extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page size: Letter or A4
    #[arg(long)]
    page_size: Option<String>,

    /// Base font size in points
    #[arg(long)]
    font_size: Option<f64>,

    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rewrite the text with the generation service before rendering
    #[arg(long)]
    rewrite: bool,

    /// Named rewrite instruction
    #[arg(long, default_value = prompts::DEFAULT_PRESET, conflicts_with = "instruction")]
    preset: String,

    /// Custom rewrite instruction
    #[arg(long)]
    instruction: Option<String>,

    /// Print the Typst markup instead of writing a PDF
    #[arg(long)]
    emit_typst: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = cli
        .config
        .as_deref()
        .map(Config::load)
        .unwrap_or_else(Config::compiled_default);
    let page = PageSpec::from_name(
        cli.page_size.as_deref().unwrap_or(&config.page.size),
        cli.font_size.unwrap_or(config.page.font_size),
    );
    let token = CancelToken::new();

    let mut text = ImporterRegistry::with_defaults()
        .import(&cli.input)
        .map_err(|e| e.to_string())?;

    if cli.rewrite {
        text = rewrite(&cli, &config, text, &token).await?;
    }

    let renderer = Renderer::from_config(&config);

    if cli.emit_typst {
        print!("{}", renderer.to_typst(&textpdf::parse(&text), &page));
        return Ok(());
    }

    let destination = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("pdf"));

    let job = RenderJob {
        text,
        page,
        renderer,
        destination,
    };
    match job.spawn(token).await.map_err(|e| e.to_string())? {
        JobOutcome::Finished(Ok(report)) => {
            println!("{}", report.message());
            Ok(())
        }
        // Full details were logged by the renderer
        JobOutcome::Finished(Err(e)) => Err(e.notice()),
        JobOutcome::Cancelled => Err("PDF generation cancelled before starting".to_string()),
    }
}

async fn rewrite(
    cli: &Cli,
    config: &Config,
    source: String,
    token: &CancelToken,
) -> Result<String, String> {
    let instruction = match &cli.instruction {
        Some(instruction) => instruction.clone(),
        None => prompts::preset(&cli.preset).ok_or_else(|| {
            let names: Vec<&str> = prompts::preset_names().collect();
            format!("Unknown preset '{}' (available: {})", cli.preset, names.join(", "))
        })?,
    };

    let tokens = estimate_tokens(&source);
    let window = config.generator.context_window;
    match context_usage(tokens, window) {
        ContextUsage::Exceeded => log::warn!(
            "Source is about {} tokens, more than the {}-token context window; output may be truncated",
            tokens,
            window
        ),
        ContextUsage::Near => log::warn!(
            "Source is about {} tokens, close to the {}-token context window",
            tokens,
            window
        ),
        ContextUsage::Normal => log::info!("Source is about {} tokens of {}", tokens, window),
    }

    let generator = ChatClient::new(config.generator.clone()).map_err(|e| e.to_string())?;
    let job = RewriteJob {
        generator: Arc::new(generator),
        source,
        instruction,
    };

    let progress: &(dyn Fn(&str) + Send + Sync) = &|message: &str| eprintln!("{}", message);
    let outcome = tokio::select! {
        outcome = job.run(token, Some(progress)) => outcome,
        _ = tokio::signal::ctrl_c() => {
            token.cancel();
            JobOutcome::Cancelled
        }
    };

    match outcome {
        JobOutcome::Finished(Ok(text)) => Ok(text),
        JobOutcome::Finished(Err(e)) => Err(format!("Text generation failed: {}", e)),
        JobOutcome::Cancelled => Err("Text generation was cancelled".to_string()),
    }
}
