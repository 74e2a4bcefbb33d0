use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use splice_refactor::config::{discover, SpliceConfig};
use splice_refactor::edit::{EditResult, TextEdit};
use splice_refactor::generator::{CommandGenerator, Generator, StaticGenerator};
use splice_refactor::response::{self, ParseFailure};
use splice_refactor::session::{Outcome, PromptReply, PromptUi, Refactorer};
use splice_refactor::{SourceDocument, Span};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Splice generated code into Rust sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $SPLICE_CONFIG, then ./splice.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the node at a selection with a ready-made response
    Apply {
        /// Rust source file to edit
        file: PathBuf,

        /// Selected byte range, START..END
        #[arg(short, long)]
        span: Span,

        /// File holding the response, or - for stdin
        #[arg(short, long)]
        response: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Fail instead of keeping an unparsable response as a comment
        #[arg(long)]
        no_annotate: bool,
    },

    /// Ask the configured generator to rewrite the selection
    Ask {
        /// Rust source file to edit
        file: PathBuf,

        /// Selected byte range, START..END
        #[arg(short, long)]
        span: Span,

        /// Prompt text (read from stdin if omitted)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Show the node at a selection and its ancestors
    Inspect {
        /// Rust source file
        file: PathBuf,

        /// Selected byte range, START..END
        #[arg(short, long)]
        span: Span,
    },

    /// Check whether a response parses, and what it would replace
    Check {
        /// Response file, or - for stdin
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            file,
            span,
            response,
            dry_run,
            diff,
            no_annotate,
        } => {
            let mut config = discover(cli.config.as_deref())?;
            if no_annotate {
                config.session.annotate_failures = false;
            }
            let text = read_input(&response)?;
            let options = RunOptions { dry_run, diff };
            cmd_apply(&file, span, text, config, options).await
        }

        Commands::Ask {
            file,
            span,
            prompt,
            dry_run,
            diff,
        } => {
            let config = discover(cli.config.as_deref())?;
            let options = RunOptions { dry_run, diff };
            cmd_ask(&file, span, prompt, config, options).await
        }

        Commands::Inspect { file, span } => cmd_inspect(&file, span),

        Commands::Check { input } => cmd_check(&input),
    }
}

/// Log to stderr, filtered by `SPLICE_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("SPLICE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug, Clone, Copy)]
struct RunOptions {
    dry_run: bool,
    diff: bool,
}

/// Prompt surface on the terminal.
///
/// A preset prompt is submitted at once; otherwise one line is read from
/// stdin on a helper thread. EOF or an empty line cancels.
struct TerminalUi {
    preset: Option<String>,
}

impl PromptUi for TerminalUi {
    fn show_prompt_surface(&self, selection: Span, reply: PromptReply) {
        if let Some(prompt) = &self.preset {
            reply.submit(prompt.clone());
            return;
        }

        eprint!("{} ", format!("prompt for {selection}>").cyan());
        let _ = io::stderr().flush();
        std::thread::spawn(move || {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(n) if n > 0 => reply.submit(line.trim_end()),
                _ => reply.cancel(),
            }
        });
    }

    fn hide_prompt_surface(&self) {}

    fn apply_inline_edit(&self, edit: &TextEdit) {
        tracing::debug!(span = %edit.span, bytes = edit.new_text.len(), "edit ready");
    }
}

/// Helper: Read a file, or stdin for `-`
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_document(file: &Path) -> Result<SourceDocument> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(SourceDocument::new(text))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (spliced)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_failure(failure: &ParseFailure) {
    eprintln!("  {}", failure.to_string().red());
    if let ParseFailure::Syntax { diagnostics } = failure {
        for diagnostic in diagnostics {
            eprintln!("    {}", diagnostic);
        }
    }
}

async fn cmd_apply(
    file: &Path,
    span: Span,
    text: String,
    config: SpliceConfig,
    options: RunOptions,
) -> Result<()> {
    let ui = TerminalUi {
        preset: Some("apply the provided response".to_string()),
    };
    let refactorer = Refactorer::new(StaticGenerator::new(text), ui, config);
    run_and_report(&refactorer, file, span, options).await
}

async fn cmd_ask(
    file: &Path,
    span: Span,
    prompt: Option<String>,
    config: SpliceConfig,
    options: RunOptions,
) -> Result<()> {
    let generator = CommandGenerator::from_config(&config.generator).ok_or_else(|| {
        anyhow::anyhow!(
            "{}\n  {}",
            "No generator configured.".red(),
            "Set [generator] command = [\"program\", \"args\"...] in splice.toml"
        )
    })?;
    let refactorer = Refactorer::new(generator, TerminalUi { preset: prompt }, config);
    println!("{}", refactorer.action_label(span).bold());
    run_and_report(&refactorer, file, span, options).await
}

async fn run_and_report<G: Generator>(
    refactorer: &Refactorer<G, TerminalUi>,
    file: &Path,
    span: Span,
    options: RunOptions,
) -> Result<()> {
    let document = load_document(file)?;
    let outcome = refactorer.run(&document, span).await?;

    match outcome {
        Outcome::Applied {
            document: updated,
            splice,
            ..
        } => {
            let verb = if options.dry_run { "Would replace" } else { "Replaced" };
            println!(
                "{} {} {} ({}) at {}",
                "✓".green(),
                verb,
                splice.replaced_category,
                splice.replaced_kind,
                splice.target_span()
            );
            if matches!(splice.resolution, splice_refactor::ResolutionKind::RootFallback) {
                println!(
                    "{}",
                    format!(
                        "  Note: no enclosing {} matched the response; the whole file is replaced",
                        splice.target_category
                    )
                    .yellow()
                );
            }
            write_edit(file, &splice.edit, options)?;
            if options.diff {
                display_diff(file, document.text(), updated.text());
            }
        }
        Outcome::Annotated {
            document: updated,
            edit,
            failure,
        } => {
            println!(
                "{} Response did not parse; kept it as a comment at {}",
                "⊙".yellow(),
                edit.span
            );
            print_failure(&failure);
            write_edit(file, &edit, options)?;
            if options.diff {
                display_diff(file, document.text(), updated.text());
            }
        }
        Outcome::Rejected { failure } => {
            eprintln!("{} Response rejected, {} left unchanged", "✗".red(), file.display());
            print_failure(&failure);
            std::process::exit(1);
        }
        Outcome::GenerationFailed { error } => {
            eprintln!("{} Generation failed - {}", "✗".red(), error);
            std::process::exit(1);
        }
        Outcome::Cancelled => {
            println!("{} Cancelled", "⊘".cyan());
        }
        Outcome::Busy | Outcome::Superseded => {
            eprintln!("{} Interaction did not complete", "✗".red());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn write_edit(file: &Path, edit: &TextEdit, options: RunOptions) -> Result<()> {
    if options.dry_run {
        println!("{}", "  [DRY RUN - file not modified]".cyan());
        return Ok(());
    }

    match edit.apply_to_file(file)? {
        EditResult::Applied { bytes_changed, .. } => {
            println!("  {} ({} bytes)", file.display(), bytes_changed);
        }
        EditResult::AlreadyApplied { .. } => {
            println!("{} {}: Already applied", "⊙".yellow(), file.display());
        }
    }
    Ok(())
}

fn cmd_inspect(file: &Path, span: Span) -> Result<()> {
    let document = load_document(file)?;
    let tree = document.syntax_tree()?;
    let anchor = tree.find_node_at(span)?;

    if tree.has_errors() {
        println!(
            "{}",
            format!("Warning: {} has {} syntax error(s)", file.display(), tree.errors().len())
                .yellow()
        );
    }

    println!("{}", "Anchor and ancestors:".bold());
    let chain: Vec<_> = anchor.ancestors().collect();
    for (depth, node) in chain.iter().rev().enumerate() {
        let first_line = node.text().lines().next().unwrap_or_default();
        let marker = if *node == anchor { "▶".green() } else { "·".dimmed() };
        println!(
            "{}{} {} ({}) {}  {}",
            "  ".repeat(depth),
            marker,
            node.category().to_string().bold(),
            node.kind(),
            node.span(),
            first_line.dimmed()
        );
    }

    Ok(())
}

fn cmd_check(input: &Path) -> Result<()> {
    let text = read_input(input)?;
    let parsed = if text.trim().is_empty() {
        Err(ParseFailure::Empty)
    } else {
        response::parse(&text)
    };

    match parsed {
        Ok(response) => {
            println!(
                "{} Parses; replaces the nearest {}",
                "✓".green(),
                response.target_category().to_string().bold()
            );
            for declaration in response.declarations() {
                println!(
                    "  - {} ({}) {}",
                    declaration.category(),
                    declaration.kind(),
                    declaration.span()
                );
            }
            Ok(())
        }
        Err(failure) => {
            eprintln!("{} Response does not parse", "✗".red());
            print_failure(&failure);
            std::process::exit(1);
        }
    }
}
