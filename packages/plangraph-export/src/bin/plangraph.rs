//! Plangraph CLI - compiles a DSL file and writes export artifacts
//!
//! Reads one Python-shaped source file, compiles the selected (or
//! auto-detected) function into a plan, and always writes `plan.json`
//! and `plan.pseudo` into the output directory. `--html` adds the
//! dagre page; otherwise `--svg` adds a graphviz rendering when the
//! `dot` executable exists.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plangraph_export::{export_html, export_svg, pseudo, ExportError};
use plangraph_ir::compile_source;

#[derive(Parser, Debug)]
#[command(name = "plangraph")]
#[command(about = "Compile a plan function into a dependency graph and export it")]
struct Cli {
    /// Source file containing the plan function
    file: PathBuf,

    /// Function to compile (default: auto-detect the first that compiles)
    #[arg(long)]
    func: Option<String>,

    /// Also write plan.html (dagre-d3, no system dependencies)
    #[arg(long)]
    html: bool,

    /// Also write plan.svg via graphviz (requires dot)
    #[arg(long)]
    svg: bool,

    /// Output directory for artifacts
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plangraph=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(&cli.file)?;
    let plan = compile_source(&source, cli.func.as_deref())?;

    fs::create_dir_all(&cli.out)?;

    let json_path = cli.out.join("plan.json");
    fs::write(&json_path, serde_json::to_string_pretty(&plan)?)?;
    info!("wrote {}", json_path.display());

    let pseudo_path = cli.out.join("plan.pseudo");
    fs::write(&pseudo_path, pseudo::generate(&plan))?;
    info!("wrote {}", pseudo_path.display());

    if cli.html {
        let html_path = cli.out.join("plan.html");
        export_html(&plan, &html_path)?;
        info!("wrote {}", html_path.display());
    } else if cli.svg {
        let svg_path = cli.out.join("plan.svg");
        match export_svg(&plan, &svg_path) {
            Ok(()) => info!("wrote {}", svg_path.display()),
            Err(e @ ExportError::GraphvizMissing) => warn!("SVG export skipped: {e}"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
