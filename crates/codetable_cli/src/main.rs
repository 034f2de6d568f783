//! Operator CLI over `codetable_core`.
//!
//! # Responsibility
//! - Seed, list, inspect and delete code tables from the shell.
//! - Exercise the core crate wiring (config, logging, storage) end to end.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codetable_core::db::open_db_with_config;
use codetable_core::{
    init_logging_from_config, CodeService, CoreConfig, ExampleMatcher, LargeCode, MatchKind,
    SmallCode, SmallCodeExample, SmallCodeField, SqliteLargeCodeRepository,
    SqliteSmallCodeRepository,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codetable")]
#[command(version, about = "Manage large/small reference code tables")]
struct Cli {
    /// TOML config file; an in-memory database is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert the USE_YN category with its Y/N entries
    Seed,
    /// Print every large code with its small codes
    List,
    /// Print one large code with its small codes
    Show { code: String },
    /// Delete one large code
    Delete { code: String },
    /// Query small codes by example
    Find {
        /// Parent code, compared case-insensitively
        #[arg(long)]
        large_code: Option<String>,
        /// Substring of the small code name
        #[arg(long)]
        name_contains: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => CoreConfig::default(),
    };
    init_logging_from_config(&config.logging).context("starting file logging")?;
    info!("event=cli_start module=cli status=ok command={:?}", cli.command);

    let conn = open_db_with_config(&config.database).context("opening code database")?;
    let service = CodeService::new(
        SqliteLargeCodeRepository::with_cascade(&conn, config.cascade)?,
        SqliteSmallCodeRepository::try_new(&conn)?,
    );

    match cli.command {
        Command::Seed => {
            let stored = service.register(&use_yn_category()?)?;
            print_large_code(&stored);
        }
        Command::List => {
            for code in service.categories()? {
                print_large_code(&code);
            }
        }
        Command::Show { code } => match service.category(&code)? {
            Some(found) => print_large_code(&found),
            None => println!("{code}: not found"),
        },
        Command::Delete { code } => {
            service.remove_category(&code)?;
            println!("{code}: deleted");
        }
        Command::Find {
            large_code,
            name_contains,
        } => {
            let example = SmallCodeExample {
                large_code,
                name: name_contains,
                ..SmallCodeExample::default()
            };
            let matcher = ExampleMatcher::matching()
                .with_matcher(SmallCodeField::LargeCode, MatchKind::IgnoreCase)
                .with_matcher(SmallCodeField::Name, MatchKind::Contains);
            for code in service.search_small_codes(&example, &matcher)? {
                print_small_code(&code);
            }
        }
    }

    Ok(())
}

fn use_yn_category() -> Result<LargeCode> {
    let mut category = LargeCode::builder("USE_YN")
        .name("Use flag")
        .category_division("SYS")
        .sort_sequence(0)
        .build()?;
    for (small_code, name, sort_sequence) in [("Y", "Used", 1), ("N", "Unused", 2)] {
        category.push_child(
            SmallCode::builder("USE_YN", small_code)
                .name(name)
                .sort_sequence(sort_sequence)
                .build()?,
        );
    }
    Ok(category)
}

fn print_large_code(code: &LargeCode) {
    println!(
        "{} [{}] {} seq={} use={}",
        code.code, code.category_division, code.name, code.sort_sequence, code.use_flag
    );
    for child in &code.children {
        print!("  ");
        print_small_code(child);
    }
}

fn print_small_code(code: &SmallCode) {
    match code.memo.as_deref() {
        Some(memo) => println!(
            "{} {} seq={} use={} memo={memo}",
            code.key(),
            code.name,
            code.sort_sequence,
            code.use_flag
        ),
        None => println!(
            "{} {} seq={} use={}",
            code.key(),
            code.name,
            code.sort_sequence,
            code.use_flag
        ),
    }
}
