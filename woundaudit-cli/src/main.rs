use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::Path;

// Import from woundaudit-core
use woundaudit_core::{
    AuditConfig, AuditFramework, AuditProcessor, AuditStages, ChronologyCheck, Document,
    DocumentPolicy,
};

// Import CLI utilities
use woundaudit_cli::{save_report_text, save_stages, write_artifact, OpenAiChatService, DEFAULT_REPORT_NAME};

#[derive(Parser)]
#[command(name = "woundaudit")]
#[command(about = "Audit wound care notes for CMS documentation compliance and export a PDF report")]
struct Args {
    /// Wound care notes to audit (.txt, .docx, .pdf), in visit order
    #[arg(short, long, num_args = 1..)]
    input: Vec<String>,

    /// Optional wound image; only its presence is passed on as context
    #[arg(long)]
    image: Option<String>,

    /// Read a pasted note from standard input (appended after --input files)
    #[arg(long)]
    stdin: bool,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in audit framework: cms-lcd, timers, or longitudinal
    #[arg(short = 'f', long)]
    framework: Option<String>,

    /// Output PDF path
    #[arg(short, long)]
    output: Option<String>,

    /// Override the chat model name
    #[arg(long)]
    model: Option<String>,

    /// Override the chat-completions endpoint base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Skip documents that fail extraction instead of aborting the run
    #[arg(long)]
    skip_failed: bool,

    /// Extract, compute metrics and compose the request without calling the service
    #[arg(long)]
    metrics_only: bool,

    /// Dump all intermediate pipeline stage outputs to a directory
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "audit_outputs/stages")]
    stages_dir: String,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    println!("🩹 Wound Documentation Audit");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    let config = build_config(&args)?;
    let documents = load_documents(&args)?;
    if documents.is_empty() {
        println!("⚠️  No notes to audit. Pass --input <file>... or --stdin.");
        std::process::exit(1);
    }

    let image_name = args.image.as_deref().map(|path| {
        if !Path::new(path).exists() {
            println!("⚠️  Image not found at: {} (still noted as attached)", path);
        }
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path)
            .to_string()
    });

    let service = OpenAiChatService::from_env(&config.service);
    if !args.metrics_only && !service.has_credential() {
        println!(
            "⚠️  {} is not set; the audit service call will fail",
            config.service.api_key_env
        );
    }
    let processor = AuditProcessor::new(config, Box::new(service))?;

    println!("📄 Auditing {} note(s)", documents.len());

    if args.metrics_only {
        match processor.prepare(&documents, image_name.as_deref()) {
            Ok(stages) => {
                print_stages(&stages);
                println!("\n📨 Composed request ({} chars):\n", stages.request.user_content.len());
                println!("{}", stages.request.user_content);
                if args.dump_stages {
                    save_stages(&stages, &args.stages_dir)?;
                    println!("\n✅ Stages dumped to: {}", args.stages_dir);
                }
            }
            Err(e) => {
                eprintln!("❌ Audit failed: {e}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    println!(
        "🔍 Auditing note, checking healing trend, and calculating risk score ({})...",
        processor.service_name()
    );
    match processor.run_with_profiling(&documents, image_name.as_deref(), args.profile) {
        Ok(outcome) => {
            print_stages(&outcome.stages);

            println!("\n📋 {}", outcome.report.title);
            println!("{}", outcome.report.narrative);

            let output_path = args
                .output
                .clone()
                .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());
            let written = write_artifact(&outcome.rendered.bytes, Path::new(&output_path))?;
            println!(
                "\n💾 PDF report saved to: {} ({} page(s))",
                written.display(),
                outcome.rendered.page_count
            );

            if args.dump_stages {
                save_stages(&outcome.stages, &args.stages_dir)?;
                save_report_text(&outcome.report, &args.stages_dir)?;
                println!("✅ Stages dumped to: {}", args.stages_dir);
            }
        }
        Err(e) => {
            eprintln!("❌ Audit failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Load config and apply CLI overrides
fn build_config(args: &Args) -> Result<AuditConfig> {
    let mut config = AuditConfig::load_with_fallback(args.config.as_deref())?;

    if let Some(config_path) = &args.config {
        println!("📋 Loaded config from: {}", config_path);
    } else {
        println!("📋 Using default config");
    }

    if let Some(framework) = &args.framework {
        config = config.with_framework(framework)?;
    }
    if let Some(model) = &args.model {
        config.service.model = model.clone();
    }
    if let Some(endpoint) = &args.endpoint {
        config.service.endpoint = endpoint.clone();
    }
    if args.skip_failed {
        config.document_policy = DocumentPolicy::SkipFailed;
    }
    config.validate()?;

    println!("📚 Framework: {} ({})", config.framework.name, config.framework.title);
    Ok(config)
}

/// Read every --input file, then the pasted note from stdin if requested
fn load_documents(args: &Args) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(args.input.len() + 1);

    for input in &args.input {
        let path = Path::new(input);
        let document =
            Document::from_path(path).with_context(|| format!("Failed to read note {}", input))?;
        documents.push(document);
    }

    if args.stdin {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read note from stdin")?;
        if text.trim().is_empty() {
            println!("⚠️  Nothing was pasted on stdin; skipping");
        } else {
            documents.push(Document::from_text("pasted_note.txt", &text));
        }
    }

    Ok(documents)
}

fn print_stages(stages: &AuditStages) {
    for rejected in &stages.rejected {
        println!(
            "⚠️  Skipped note {} ({}): {}",
            rejected.position, rejected.name, rejected.reason
        );
    }

    for analysis in &stages.notes {
        let ids = &analysis.identifiers;
        println!("\n🗂️  Note {}: {}", analysis.note.position, analysis.note.source_name);
        println!("   - Patient: {}", ids.patient_display());
        println!("   - Visit date: {}", ids.visit_date_display());
        println!("   - Provider: {}", ids.provider_display());
        println!("   - Facility: {}", ids.facility_display());
    }

    match &stages.chronology {
        ChronologyCheck::OutOfOrder { first_regression_at } => println!(
            "\n⚠️  Visit dates go backwards at note {}; notes are audited in upload order",
            first_regression_at
        ),
        ChronologyCheck::Undetermined => {
            println!("\nℹ️  Visit order could not be checked (missing or unparseable dates)")
        }
        ChronologyCheck::InOrder | ChronologyCheck::SingleNote => {}
    }

    let metrics = &stages.metrics;
    match metrics.trajectory.percent() {
        Some(_) => println!("\n📉 Healing Trajectory: {}", metrics.trajectory),
        None => println!("\n⚠️  Healing Trajectory: {}", metrics.trajectory),
    }
    println!(
        "⚠️  Wound Risk Score: {} (score {})",
        metrics.risk_score, metrics.risk_points
    );
    for m in &metrics.measurements {
        println!("   - Measurement: {} x {} cm x {}", m.length, m.width, m.depth);
    }
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --config <path>         Load custom config file (YAML)");
    println!("  --input <path>...       Notes to audit, in visit order (.txt, .docx, .pdf)");
    println!("  --stdin                 Read a pasted note from standard input");
    println!("  --image <path>          Attach a wound image (presence only)");
    println!("  --framework <name>      Built-in audit framework");
    println!("  --output <path>         Output PDF path (default: {})", DEFAULT_REPORT_NAME);
    println!("  --model <name>          Chat model (default: gpt-4o)");
    println!("  --endpoint <url>        Chat-completions base URL");
    println!("  --skip-failed           Skip unreadable notes instead of aborting");
    println!("  --metrics-only          Stop before calling the audit service");

    println!("\n📚 Audit Frameworks:");
    for name in AuditFramework::builtin_names() {
        if let Ok(framework) = AuditFramework::builtin(name) {
            println!(
                "  {:<12} - {} ({} sections)",
                name,
                framework.title,
                framework.sections.len()
            );
        }
    }

    println!("\n🔑 Credentials:");
    println!("  The service key is read from OPENAI_API_KEY (or service.api_key_env in the config)");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i visit1.docx visit2.docx");
    println!("  cargo run -- -i note.pdf --image wound.jpg -o audit.pdf");
    println!("  cargo run -- -i note.txt -f timers --metrics-only");
    println!("  pbpaste | cargo run -- --stdin");
}
