use clap::Parser;
use seqsort::{logging, Cli, Command, OutputFormatter, OutputMode, SeqSort, SeqSortError, UserFriendlyError};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    logging::init_logging(cli.verbosity_level(), cli.quiet);

    if cli.command == Command::GenerateConfig {
        return handle_generate_config(&cli);
    }

    let seqsort = match SeqSort::from_cli(&cli) {
        Ok(seqsort) => seqsort,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let Some(request) = cli.command.tool_request() else {
        return 0;
    };

    match seqsort.run_tool(request, cli.dry_run).await {
        Ok(report) => {
            seqsort.output_formatter().print_run_report(&report);

            if report.has_errors() {
                2 // Completed with per-entry errors
            } else {
                0
            }
        }
        Err(e) => {
            seqsort.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &SeqSortError) -> i32 {
    match error {
        SeqSortError::DirectoryNotFound { .. } => 3,
        SeqSortError::WorkbookNotFound { .. }
        | SeqSortError::Workbook { .. }
        | SeqSortError::SheetNotFound { .. } => 4,
        SeqSortError::MissingColumns { .. } => 5,
        SeqSortError::Busy { .. } => 6,
        SeqSortError::RecordWrite { .. } => 7,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli.config_output_path();

    match SeqSort::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path.display());
            println!("\nTo use this configuration:");
            println!("  seqsort <command> --config {}", config_path.display());
            println!("\nEdit the file to set workbook paths and column names for your lab.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &SeqSortError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::try_parse_from([
            "seqsort",
            "generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(handle_generate_config(&cli), 0);
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[cleanup]"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&SeqSortError::DirectoryNotFound {
                path: "x".to_string()
            }),
            3
        );
        assert_eq!(
            exit_code_for(&SeqSortError::SheetNotFound {
                path: "x".to_string(),
                sheet: "WGK - Initiated".to_string(),
                available: vec![],
            }),
            4
        );
        assert_eq!(
            exit_code_for(&SeqSortError::MissingColumns {
                path: "x".to_string(),
                missing: vec!["BBID".to_string()],
            }),
            5
        );
        assert_eq!(exit_code_for(&SeqSortError::Busy { tool: "zip".to_string() }), 6);
        assert_eq!(
            exit_code_for(&SeqSortError::Config {
                message: "bad".to_string()
            }),
            1
        );
    }
}
