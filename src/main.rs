use std::env;
use std::path::PathBuf;
use std::process;

use gaslight_dossier::content::repository::ContentRepository;
use gaslight_dossier::content::sqlite::SqliteContentRepository;
use gaslight_dossier::content::validation::{validate_content, IssueSeverity, ValidationReport};

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    let opts = parse_args(env::args().collect());
    let db_path = opts.db_path;
    if !db_path.exists() {
        eprintln!(
            "DB not found at {}. Use --db <path> to point at a valid SQLite file.",
            db_path.display()
        );
        process::exit(1);
    }

    let repo = match SqliteContentRepository::open(&db_path) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("Failed to open DB: {}", err);
            process::exit(1);
        }
    };

    let (catalog, registry, roster) = match load_registries(&repo) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Failed to load content: {}", err);
            process::exit(1);
        }
    };

    if !opts.quiet {
        println!(
            "{}Checking deduction graph{} ({} evidence, {} recipes, {} voices)",
            BOLD,
            RESET,
            catalog.len(),
            registry.len(),
            roster.len()
        );
    }

    let report = validate_content(&catalog, &registry, &roster);
    print_report(&report);

    if report.has_errors() {
        if !opts.quiet {
            println!(
                "\n{}{} error(s), {} warning(s).{}",
                RED,
                report.errors.len(),
                report.warnings.len(),
                RESET
            );
        }
        process::exit(1);
    }

    if !opts.quiet {
        println!(
            "\n{}Graph is consistent. {} warning(s).{}",
            GREEN,
            report.warnings.len(),
            RESET
        );
    }
}

type Registries = (
    gaslight_dossier::content::repository::EvidenceCatalog,
    gaslight_dossier::content::repository::RecipeRegistry,
    gaslight_dossier::content::repository::VoiceRoster,
);

fn load_registries(
    repo: &SqliteContentRepository,
) -> Result<Registries, Box<dyn std::error::Error>> {
    let catalog = repo.load_evidence_catalog()?;
    let registry = repo.load_recipe_registry()?;
    let roster = repo.load_voice_roster()?;
    Ok((catalog, registry, roster))
}

fn print_report(report: &ValidationReport) {
    for issue in report.iter() {
        match issue.severity {
            IssueSeverity::Error => {
                println!("{}[ERROR]{} {}: {}", RED, RESET, issue.code, issue.message)
            }
            IssueSeverity::Warning => println!(
                "{}[WARN]{} {}: {}",
                YELLOW, RESET, issue.code, issue.message
            ),
        }
    }
}

struct CliOptions {
    db_path: PathBuf,
    quiet: bool,
}

fn parse_args(args: Vec<String>) -> CliOptions {
    let mut opts = CliOptions {
        db_path: PathBuf::from("content/case_pack.db"),
        quiet: false,
    };
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--db" => {
                if let Some(value) = iter.next() {
                    opts.db_path = PathBuf::from(value);
                }
            }
            "--quiet" | "-q" => opts.quiet = true,
            "--help" | "-h" => {
                println!("Usage: validate-graph [--db <path>] [--quiet]");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }
    opts
}
