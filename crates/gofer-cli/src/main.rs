use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gofer_config::{init_tracing, load_for_workspace};
use gofer_core::{canonicalize_or_self, LineCol, LineIndex};
use gofer_workspace::{Diagnostic, TextSize, Workspace};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "gofer", version, about = "Gofer CLI (package rename, diagnostics)")]
struct Cli {
    /// Workspace root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what a rename at a position would target
    PrepareRename(PrepareArgs),
    /// Rename the package at a position
    Rename(RenameArgs),
    /// Report diagnostics for a file or directory
    Diagnostics(DiagnosticsArgs),
    /// Move a file or directory and report the resulting diagnostics
    Mv(MoveArgs),
}

#[derive(Args)]
struct PrepareArgs {
    /// `FILE:LINE:COL` (1-based) or `FILE:#OFFSET`
    position: String,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenameArgs {
    /// `FILE:LINE:COL` (1-based) or `FILE:#OFFSET`
    position: String,
    new_name: String,
    /// Write the changes instead of printing the plan
    #[arg(long)]
    apply: bool,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DiagnosticsArgs {
    /// File or directory (defaults to the workspace root)
    path: Option<PathBuf>,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct MoveArgs {
    from: PathBuf,
    to: PathBuf,
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let ws = open_workspace(&cli.root)?;

    match cli.command {
        Command::PrepareRename(args) => {
            let (file, offset) = resolve_position(&ws, &args.position)?;
            let prepared = ws.prepare_rename(&file, offset)?;
            if args.json {
                print_json(&prepared)?;
            } else {
                println!(
                    "{} ({}) in {}",
                    prepared.text,
                    prepared.target.import_path,
                    prepared.target.dir.display()
                );
            }
            Ok(0)
        }
        Command::Rename(args) => {
            let (file, offset) = resolve_position(&ws, &args.position)?;
            let plan = ws.rename(&file, offset, &args.new_name)?;
            if !args.apply {
                if args.json {
                    print_json(&plan)?;
                } else {
                    for mv in &plan.edit.moves {
                        println!("move {} -> {}", rel(&ws, &mv.from), rel(&ws, &mv.to));
                    }
                    for (path, edits) in &plan.edit.text_edits {
                        println!("edit {} ({} changes)", rel(&ws, path), edits.len());
                    }
                }
                return Ok(0);
            }

            let version = ws.apply_plan(&plan)?;
            let diagnostics = ws.diagnostics(ws.root());
            if args.json {
                print_json(&Applied {
                    version,
                    moves: plan.edit.moves.len(),
                    edited_files: plan.edit.text_edits.len(),
                    diagnostics: &diagnostics,
                })?;
            } else {
                println!(
                    "renamed {} to {}: {} moves, {} files edited",
                    plan.target.name,
                    plan.new_name,
                    plan.edit.moves.len(),
                    plan.edit.text_edits.len()
                );
                print_diagnostics(&ws, &diagnostics);
            }
            Ok(0)
        }
        Command::Diagnostics(args) => {
            let path = match &args.path {
                Some(path) => absolute(path)?,
                None => ws.root().to_path_buf(),
            };
            let diagnostics = ws.diagnostics(&path);
            if args.json {
                print_json(&diagnostics)?;
            } else {
                print_diagnostics(&ws, &diagnostics);
            }
            Ok(if diagnostics.is_empty() { 0 } else { 1 })
        }
        Command::Mv(args) => {
            let from = absolute(&args.from)?;
            let to = absolute(&args.to)?;
            ws.move_path(&from, &to)?;
            let diagnostics = ws.diagnostics(ws.root());
            if args.json {
                print_json(&diagnostics)?;
            } else {
                println!("moved {} -> {}", rel(&ws, &from), rel(&ws, &to));
                print_diagnostics(&ws, &diagnostics);
            }
            Ok(0)
        }
    }
}

/// Load the configuration and start logging before indexing, so the indexing
/// events are recorded too.
fn open_workspace(root: &Path) -> Result<Workspace> {
    if !root.is_dir() {
        bail!("failed to open workspace root {}: not a directory", root.display());
    }
    let root = absolute(root)?;
    let (config, config_path) = load_for_workspace(&root)
        .with_context(|| format!("failed to load configuration for {}", root.display()))?;
    init_tracing(&config.logging);
    if let Some(path) = &config_path {
        tracing::debug!(target: "gofer.cli", path = %path.display(), "loaded config");
    }

    let ws = Workspace::with_config(root.clone(), config)
        .with_context(|| format!("failed to index workspace {}", root.display()))?;
    tracing::debug!(target: "gofer.cli", root = %ws.root().display(), "workspace loaded");
    Ok(ws)
}

#[derive(Serialize)]
struct Applied<'a> {
    version: u64,
    moves: usize,
    edited_files: usize,
    diagnostics: &'a [Diagnostic],
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_diagnostics(ws: &Workspace, diagnostics: &[Diagnostic]) {
    let mut lines: Option<(PathBuf, LineIndex)> = None;
    for d in diagnostics {
        if lines.as_ref().map(|(path, _)| path) != Some(&d.file) {
            let text = ws
                .document_text(&d.file)
                .or_else(|| std::fs::read_to_string(&d.file).ok())
                .unwrap_or_default();
            lines = Some((d.file.clone(), LineIndex::new(&text)));
        }
        let pos = lines
            .as_ref()
            .map(|(_, index)| index.line_col(d.range.start()))
            .unwrap_or(LineCol { line: 0, col: 0 });
        println!(
            "{}:{}:{}: {}",
            rel(ws, &d.file),
            pos.line + 1,
            pos.col + 1,
            d.message
        );
    }
    println!("summary: {} diagnostics", diagnostics.len());
}

fn rel(ws: &Workspace, path: &Path) -> String {
    path.strip_prefix(ws.root())
        .unwrap_or(path)
        .display()
        .to_string()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to read the current directory")?
            .join(path)
    };
    Ok(canonicalize_or_self(&path))
}

/// Parse `FILE:LINE:COL` (1-based) or `FILE:#OFFSET` into a file and byte offset.
fn resolve_position(ws: &Workspace, position: &str) -> Result<(PathBuf, TextSize)> {
    let parsed = parse_position(position)?;
    let file = absolute(Path::new(parsed.file))?;
    let offset = match parsed.at {
        At::Offset(offset) => TextSize::from(offset),
        At::LineCol { line, col } => {
            let text = match ws.document_text(&file) {
                Some(text) => text,
                None => std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
            };
            let line_col = LineCol {
                line: line - 1,
                col: col - 1,
            };
            match LineIndex::new(&text).offset(line_col) {
                Some(offset) => offset,
                None => bail!("{line}:{col} is outside {}", file.display()),
            }
        }
    };
    Ok((file, offset))
}

#[derive(Debug, PartialEq, Eq)]
enum At {
    Offset(u32),
    LineCol { line: u32, col: u32 },
}

#[derive(Debug, PartialEq, Eq)]
struct Position<'a> {
    file: &'a str,
    at: At,
}

fn parse_position(position: &str) -> Result<Position<'_>> {
    if let Some((file, offset)) = position.rsplit_once(":#") {
        let offset = offset
            .parse()
            .with_context(|| format!("invalid offset in {position:?}"))?;
        return Ok(Position {
            file,
            at: At::Offset(offset),
        });
    }

    let mut parts = position.rsplitn(3, ':');
    let (Some(col), Some(line), Some(file)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("expected FILE:LINE:COL or FILE:#OFFSET, got {position:?}");
    };
    let line: u32 = line
        .parse()
        .with_context(|| format!("invalid line in {position:?}"))?;
    let col: u32 = col
        .parse()
        .with_context(|| format!("invalid column in {position:?}"))?;
    if line == 0 || col == 0 {
        bail!("lines and columns start at 1, got {position:?}");
    }
    Ok(Position {
        file,
        at: At::LineCol { line, col },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positions() {
        assert_eq!(
            parse_position("lib/a.go:#8").unwrap(),
            Position {
                file: "lib/a.go",
                at: At::Offset(8)
            }
        );
        assert_eq!(
            parse_position("C:/ws/lib/a.go:1:9").unwrap(),
            Position {
                file: "C:/ws/lib/a.go",
                at: At::LineCol { line: 1, col: 9 }
            }
        );
        assert!(parse_position("lib/a.go").is_err());
        assert!(parse_position("lib/a.go:0:1").is_err());
        assert!(parse_position("lib/a.go:#x").is_err());
    }
}
