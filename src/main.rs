use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use cpp_translator::edit::commit_batch;
use cpp_translator::{
    load_table, EngineError, IncludeTable, IncludesPatch, PatchEngine, SourceFile, Translation,
};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Extensions picked up when a directory is given as input.
const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "h", "hpp", "inc"];

#[derive(Parser)]
#[command(name = "cpp-translator")]
#[command(about = "Structural rewriting of LLVM backend sources into Capstone modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate source files for one architecture
    Translate {
        /// Target profile, e.g. ARM or PPC
        #[arg(short, long)]
        arch: String,

        /// Directory translated files are written to
        #[arg(short, long, required_unless_present = "dry_run")]
        output: Option<PathBuf>,

        /// Extra include table layered over the built-in one
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Translate in memory only; write nothing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print a JSON report instead of status lines
        #[arg(long)]
        json: bool,

        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check that the include table covers every input file
    Check {
        /// Target profile, e.g. ARM or PPC
        #[arg(short, long)]
        arch: String,

        /// Extra include table layered over the built-in one
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Source files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List profiles and the files each one has an include block for
    List {
        /// Extra include table layered over the built-in one
        #[arg(short, long)]
        table: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Translate {
            arch,
            output,
            table,
            dry_run,
            diff,
            json,
            paths,
        } => cmd_translate(&arch, output, table, dry_run, diff, json, &paths),

        Commands::Check { arch, table, paths } => cmd_check(&arch, table, &paths),

        Commands::List { table } => cmd_list(table),
    };

    if let Err(err) = result {
        eprintln!("{} {}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the overlay table: explicit flag first, then CPP_TRANSLATOR_TABLE.
fn resolve_table(cli_table: Option<PathBuf>) -> Result<IncludeTable> {
    let overlay = cli_table.or_else(|| env::var_os("CPP_TRANSLATOR_TABLE").map(PathBuf::from));
    Ok(load_table(overlay.as_deref())?)
}

/// Expand inputs into a sorted list of source files.
///
/// Directories are walked for known source extensions; files given directly
/// are taken as-is. Two inputs with the same file name are rejected, since the
/// file name is the dispatch key and the output name.
fn discover_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();

    for path in paths {
        let candidates: Vec<PathBuf> = if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                let is_source = entry
                    .path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
                if entry.file_type().is_file() && is_source {
                    found.push(entry.path().to_path_buf());
                }
            }
            found
        } else if path.is_file() {
            vec![path.clone()]
        } else {
            anyhow::bail!("input does not exist: {}", path.display());
        };

        for candidate in candidates {
            let name = candidate
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("not a valid file name: {}", candidate.display()))?;
            if let Some(previous) = by_name.insert(name.clone(), candidate.clone()) {
                anyhow::bail!(
                    "two inputs share the file name '{}': {} and {}",
                    name,
                    previous.display(),
                    candidate.display()
                );
            }
        }
    }

    if by_name.is_empty() {
        anyhow::bail!("no source files found");
    }

    Ok(by_name.into_values().collect())
}

fn read_sources(paths: &[PathBuf]) -> Result<Vec<SourceFile>> {
    let files = discover_sources(paths)?
        .iter()
        .map(|path| SourceFile::read(path))
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(files)
}

fn build_engine(arch: &str, table: IncludeTable) -> Result<PatchEngine> {
    let table = Arc::new(table);
    Ok(PatchEngine::new().with_patch(IncludesPatch::new(0, arch, table))?)
}

/// Helper: Show unified diff between original and translated content
fn display_diff(name: &str, original: &[u8], translated: &[u8]) {
    let original = String::from_utf8_lossy(original);
    let translated = String::from_utf8_lossy(translated);

    println!("\n{}", format!("--- {} (original)", name).dimmed());
    println!("{}", format!("+++ {} (translated)", name).dimmed());

    let diff = TextDiff::from_lines(original.as_ref(), translated.as_ref());

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    output: Option<PathBuf>,
    replacements: usize,
    bytes: usize,
    digest: String,
}

fn cmd_translate(
    arch: &str,
    output: Option<PathBuf>,
    table: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
    json: bool,
    paths: &[PathBuf],
) -> Result<()> {
    let table = resolve_table(table)?;
    let engine = build_engine(arch, table)?;

    let files = read_sources(paths)?;
    engine.preflight(&files)?;

    // Nothing is written unless every file translated.
    let translations = engine.run(&files)?;

    let output_dir = if dry_run { None } else { output };
    if let Some(dir) = &output_dir {
        commit_batch(
            dir,
            translations
                .iter()
                .map(|t| (t.name.as_str(), t.output.as_slice())),
        )?;
    }

    if json {
        let report: Vec<FileReport<'_>> = translations
            .iter()
            .map(|t| FileReport {
                file: &t.name,
                output: output_dir.as_ref().map(|dir| dir.join(&t.name)),
                replacements: t.replacements,
                bytes: t.output.len(),
                digest: format!("{:016x}", t.digest()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if dry_run {
        println!("{}", "[DRY RUN - nothing written]".cyan());
    }
    for (file, translation) in files.iter().zip(&translations) {
        report_translation(translation, output_dir.as_deref());
        if show_diff && file.contents != translation.output {
            display_diff(&file.name, &file.contents, &translation.output);
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} files translated for {}",
        format!("{}", translations.len()).green(),
        arch.bold()
    );
    println!(
        "  {} replacements",
        format!("{}", translations.iter().map(|t| t.replacements).sum::<usize>()).green()
    );

    Ok(())
}

fn report_translation(translation: &Translation, output_dir: Option<&Path>) {
    let target = match output_dir {
        Some(dir) => dir.join(&translation.name).display().to_string(),
        None => "(not written)".to_string(),
    };
    println!(
        "{} {}: {} replacements -> {} {}",
        "✓".green(),
        translation.name,
        translation.replacements,
        target,
        format!("[{:016x}]", translation.digest()).dimmed()
    );
}

fn cmd_check(arch: &str, table: Option<PathBuf>, paths: &[PathBuf]) -> Result<()> {
    let table = resolve_table(table)?;
    let engine = build_engine(arch, table)?;

    let files = read_sources(paths)?;

    match engine.preflight(&files) {
        Ok(()) => {
            for file in &files {
                println!("{} {}", "✓".green(), file.name);
            }
            println!(
                "\n{} files covered for {}",
                format!("{}", files.len()).green(),
                arch.bold()
            );
            Ok(())
        }
        Err(EngineError::Coverage(coverage)) => {
            for error in &coverage.errors {
                eprintln!("{} {}", "✗".red(), error);
            }
            anyhow::bail!(
                "include table does not cover the inputs for {} ({} problem(s))",
                arch,
                coverage.errors.len()
            )
        }
        Err(other) => Err(other.into()),
    }
}

fn cmd_list(table: Option<PathBuf>) -> Result<()> {
    let table = resolve_table(table)?;

    for profile in table.profiles() {
        println!("{}", profile.bold());
        for file in table.files(profile).into_iter().flatten() {
            println!("  - {}", file);
        }
    }

    Ok(())
}
