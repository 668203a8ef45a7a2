use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use solvebook_editor_core::EditorConfig;
use solvebook_renderer::{RenderPipeline, Renderer};

mod page;

#[derive(Parser)]
#[command(version, about = "Solvebook - preview markdown+LaTeX solutions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor configuration file (JSON)
    #[arg(long, global = true, env = "SOLVEBOOK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown+LaTeX file to HTML
    Render {
        /// Source file, `-` for stdin
        input: PathBuf,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit only the rendered fragment, without page or stylesheet
        #[arg(long)]
        fragment: bool,

        /// Page title, defaults to the input file name
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the stylesheet for previews and highlighted code
    Css {
        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            input,
            output,
            fragment,
            title,
        } => {
            let title = title.unwrap_or_else(|| default_title(&input));
            let html = render_file(&input, &config, fragment, &title)?;
            write_output(output.as_deref(), &html)?;
        }
        Commands::Css { output } => {
            let css = solvebook_renderer::syntax_css()?;
            write_output(output.as_deref(), &css)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let config = EditorConfig::from_json(&json)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(input)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", input.display()))
}

fn render_file(input: &Path, config: &EditorConfig, fragment: bool, title: &str) -> Result<String> {
    let source = read_input(input)?;
    let renderer = Renderer::new(config.render.clone());
    let output = renderer.render(&source)?;
    for warning in &output.warnings {
        tracing::warn!(%warning, "contained render failure");
    }
    tracing::info!(
        input = %input.display(),
        bytes = output.html.len(),
        warnings = output.warnings.len(),
        "rendered"
    );

    if fragment {
        return Ok(output.html);
    }
    let css = solvebook_renderer::syntax_css()?;
    Ok(page::standalone_page(title, &output.html, &css))
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .into_diagnostic()
            .wrap_err_with(|| format!("writing {}", path.display())),
        None => std::io::stdout()
            .lock()
            .write_all(content.as_bytes())
            .into_diagnostic(),
    }
}

fn default_title(input: &Path) -> String {
    input
        .file_stem()
        .filter(|_| input.as_os_str() != "-")
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Solution".to_string())
}

/// Logs go to stderr so rendered output can be piped.
fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn init_miette() {
    let hook = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    if hook.is_ok() {
        miette::set_panic_hook();
    }
}
