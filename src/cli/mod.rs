use std::net::SocketAddr;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use serde::Serialize;

use crate::models::{SEARCH_RESULT_VERSION, VALIDATION_REPORT_VERSION};
use crate::search::engine;
use crate::searchdata::{self, SECTION_INDEX_FILE};
use crate::server;

mod args;
mod config;
mod format;
mod http_backend;

pub use args::{
    Cli, Commands, GenerateArgs, IndexArgs, IndexInfoArgs, OutputFormat, SearchArgs, ServeArgs,
    ShowArgs, ShowFormat, ValidateArgs,
};

use config::{
    apply_generate_config_defaults, apply_index_config_defaults, apply_index_info_config_defaults,
    apply_search_config_defaults, apply_serve_config_defaults, apply_validate_config_defaults,
    load_cli_config,
};
use http_backend::HttpSearchBackend;

/// Entry point for the CLI binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.schema_version {
        println!("Search result JSON schema version: {SEARCH_RESULT_VERSION}");
        println!("Validation report JSON schema version: {VALIDATION_REPORT_VERSION}");
        return Ok(());
    }

    let cli_config = load_cli_config()?;

    match cli.command {
        Some(Commands::Search(mut search_args)) => {
            if let Some(ref config) = cli_config {
                apply_search_config_defaults(config, &mut search_args);
            }

            let config = args::search_config_from_args(&search_args)?;
            let result = if let Some(server_url) =
                effective_server_url(search_args.server.as_deref(), search_args.no_server)
            {
                let backend = HttpSearchBackend::new(server_url)?;
                backend.search(config)?
            } else {
                engine::run_search(config)?
            };

            match search_args.format {
                OutputFormat::Text => format::print_text(&result),
                OutputFormat::Table => format::print_table(&result),
                OutputFormat::Json => print_json(&result),
            }
        }
        Some(Commands::Validate(mut validate_args)) => {
            if let Some(ref config) = cli_config {
                apply_validate_config_defaults(config, &mut validate_args);
            }

            let config = args::validate_config_from_args(&validate_args);
            let report = if let Some(server_url) =
                effective_server_url(validate_args.server.as_deref(), validate_args.no_server)
            {
                let backend = HttpSearchBackend::new(server_url)?;
                backend.validate(config)?
            } else {
                crate::validate::run_validate(config)?
            };

            match validate_args.format {
                OutputFormat::Text => format::print_validation_text(&report)?,
                OutputFormat::Table => format::print_validation_table(&report)?,
                OutputFormat::Json => print_json(&report)?,
            }

            if !report.summary.passed {
                bail!(
                    "validation failed with {} error(s) and {} warning(s)",
                    report.summary.errors,
                    report.summary.warnings
                );
            }
            Ok(())
        }
        Some(Commands::Show(show_args)) => run_show(&show_args),
        Some(Commands::Index(mut index_args)) => {
            if let Some(ref config) = cli_config {
                apply_index_config_defaults(config, &mut index_args);
            }

            let config = args::index_config_from_args(&index_args)?;
            let summary = if let Some(server_url) =
                effective_server_url(index_args.server.as_deref(), index_args.no_server)
            {
                let backend = HttpSearchBackend::new(server_url)?;
                backend.index(config)?
            } else {
                crate::index::run_index(config)?
            };

            match index_args.format {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Text | OutputFormat::Table => {
                    println!(
                        "Indexed {} files and {} entries using {:?} backend at {}",
                        summary.files_indexed,
                        summary.entries_indexed,
                        summary.backend,
                        summary.index_path.display()
                    );
                    Ok(())
                }
            }
        }
        Some(Commands::IndexInfo(mut info_args)) => {
            if let Some(ref config) = cli_config {
                apply_index_info_config_defaults(config, &mut info_args);
            }

            let config = args::index_info_config_from_args(&info_args)?;
            let summary = if let Some(server_url) =
                effective_server_url(info_args.server.as_deref(), info_args.no_server)
            {
                let backend = HttpSearchBackend::new(server_url)?;
                backend.index_info(config)?
            } else {
                crate::index::get_index_info(&config)?
            };

            match info_args.format {
                OutputFormat::Text | OutputFormat::Table => {
                    format::print_index_summary_text(&summary)
                }
                OutputFormat::Json => print_json(&summary),
            }
        }
        Some(Commands::Generate(mut generate_args)) => {
            if let Some(ref config) = cli_config {
                apply_generate_config_defaults(config, &mut generate_args);
            }

            let config = args::generate_config_from_args(&generate_args);
            let summary = crate::generate::run_generate(config)?;

            match generate_args.format {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Text | OutputFormat::Table => {
                    format::print_generate_summary_text(&summary)
                }
            }
        }
        Some(Commands::Serve(mut serve_args)) => {
            if let Some(ref config) = cli_config {
                apply_serve_config_defaults(config, &mut serve_args);
            }

            let addr: SocketAddr = serve_args.addr.parse()?;
            println!("Starting doxsearch HTTP server on http://{addr}");

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(server::run(addr))?;
            Ok(())
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_show(args: &ShowArgs) -> Result<()> {
    let is_section_index = args
        .file
        .file_name()
        .is_some_and(|name| name == SECTION_INDEX_FILE);

    if is_section_index {
        let index = searchdata::load_section_index(&args.file)?;
        return match args.format {
            ShowFormat::Text => format::print_section_index_text(&args.file, &index),
            ShowFormat::Json => print_json(&index),
            ShowFormat::Js => {
                print!("{}", searchdata::write_section_index(&index));
                Ok(())
            }
        };
    }

    let file = searchdata::load_file(&args.file)?;
    match args.format {
        ShowFormat::Text => format::print_search_data_text(&args.file, &file),
        ShowFormat::Json => print_json(&file),
        ShowFormat::Js => {
            print!("{}", searchdata::write_search_data(&file));
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer(std::io::stdout(), value)?;
    println!();
    Ok(())
}

fn effective_server_url(server_flag: Option<&str>, no_server: bool) -> Option<String> {
    if no_server {
        None
    } else {
        server_flag.map(|s| s.to_string())
    }
}
