use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

use crate::types::{SortDir, VALID_SORT_DIRS};

#[derive(Parser)]
#[command(name = "gridcache")]
#[command(about = "Paged result-set cache and grid data controller")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
}

/// What part of a table to show: paging, sort, filters and visible columns.
#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Path to a JSON table file ({"columns": [...], "rows": [...]})
    pub table: PathBuf,

    /// Index of the first row to show
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Rows per page (default: grid.page_size from config)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Column to sort by
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort direction: asc, desc, none (default: asc when --sort is given)
    #[arg(long, value_parser = parse_sort_dir)]
    pub dir: Option<SortDir>,

    /// Text filter on a column, as COL=PATTERN (can be repeated)
    #[arg(long = "filter", value_name = "COL=PATTERN", value_parser = parse_assignment, action = clap::ArgAction::Append)]
    pub filters: Vec<(String, String)>,

    /// Exact value picked for a column, as COL=VALUE (can be repeated)
    #[arg(long = "select", value_name = "COL=VALUE", value_parser = parse_assignment, action = clap::ArgAction::Append)]
    pub selections: Vec<(String, String)>,

    /// Comma-separated list of columns to show (default: all non-hidden columns)
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,
}

impl GridArgs {
    /// Effective sort direction: `--sort` alone sorts ascending.
    pub fn sort_dir(&self) -> SortDir {
        match (&self.sort, self.dir) {
            (_, Some(dir)) => dir,
            (Some(_), None) => SortDir::Asc,
            (None, None) => SortDir::None,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show one page of a table
    #[command(visible_alias = "p")]
    Page {
        #[command(flatten)]
        grid: GridArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the filtered, sorted table as tab-separated values
    Export {
        #[command(flatten)]
        grid: GridArgs,

        /// Write the export to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for [possible values: bash, zsh, fish, powershell, elvish]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (grid.page_size, grid.filter_debounce_ms, store.max_distinct_values)
        key: String,
        /// Value to set
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Get a configuration value
    Get {
        /// Configuration key (grid.page_size, grid.filter_debounce_ms, store.max_distinct_values)
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Execute the command, dispatching to the appropriate handler.
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{
            cmd_config_get, cmd_config_set, cmd_config_show, cmd_export, cmd_page,
        };

        match self {
            Commands::Page { grid, json } => cmd_page(grid, OutputOptions { json }).await,
            Commands::Export { grid, output, json } => {
                cmd_export(grid, output.as_deref(), OutputOptions { json }).await
            }

            Commands::Config { action } => match action {
                ConfigAction::Show { json } => cmd_config_show(OutputOptions { json }),
                ConfigAction::Set { key, value, json } => {
                    cmd_config_set(&key, &value, OutputOptions { json })
                }
                ConfigAction::Get { key, json } => cmd_config_get(&key, OutputOptions { json }),
            },

            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

fn parse_sort_dir(s: &str) -> Result<SortDir, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid sort direction. Must be one of: {}",
            VALID_SORT_DIRS.join(", ")
        )
    })
}

/// Split `COL=VALUE` at the first `=`. The value may be empty.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid value '{s}'. Expected COL=VALUE")),
    }
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "gridcache", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("name=foo").unwrap(),
            ("name".to_string(), "foo".to_string())
        );
        assert_eq!(
            parse_assignment("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("name=").unwrap(),
            ("name".to_string(), String::new())
        );
    }

    #[test]
    fn test_parse_assignment_rejects_missing_column() {
        assert!(parse_assignment("foo").is_err());
        assert!(parse_assignment("=foo").is_err());
        let err = parse_assignment("foo").unwrap_err();
        assert!(err.contains("COL=VALUE"));
    }

    #[test]
    fn test_parse_sort_dir() {
        assert_eq!(parse_sort_dir("asc").unwrap(), SortDir::Asc);
        assert_eq!(parse_sort_dir("DESC").unwrap(), SortDir::Desc);
        let err = parse_sort_dir("up").unwrap_err();
        assert!(err.contains("Must be one of"));
    }

    #[test]
    fn test_page_arguments() {
        let cli = Cli::try_parse_from([
            "gridcache",
            "page",
            "table.json",
            "--offset",
            "10",
            "--sort",
            "name",
            "--filter",
            "name=foo",
            "--filter",
            "size=>3",
            "--select",
            "kind=file",
            "--columns",
            "name,size",
        ])
        .unwrap();

        let Commands::Page { grid, json } = cli.command else {
            panic!("expected page command");
        };
        assert!(!json);
        assert_eq!(grid.offset, 10);
        assert_eq!(grid.limit, None);
        assert_eq!(grid.sort.as_deref(), Some("name"));
        assert_eq!(grid.sort_dir(), SortDir::Asc);
        assert_eq!(grid.filters.len(), 2);
        assert_eq!(grid.filters[1], ("size".to_string(), ">3".to_string()));
        assert_eq!(grid.selections, vec![("kind".to_string(), "file".to_string())]);
        assert_eq!(
            grid.columns,
            Some(vec!["name".to_string(), "size".to_string()])
        );
    }

    #[test]
    fn test_sort_dir_defaults() {
        let cli = Cli::try_parse_from(["gridcache", "page", "t.json"]).unwrap();
        let Commands::Page { grid, .. } = cli.command else {
            panic!("expected page command");
        };
        assert_eq!(grid.sort_dir(), SortDir::None);

        let cli =
            Cli::try_parse_from(["gridcache", "page", "t.json", "--sort", "a", "--dir", "desc"])
                .unwrap();
        let Commands::Page { grid, .. } = cli.command else {
            panic!("expected page command");
        };
        assert_eq!(grid.sort_dir(), SortDir::Desc);
    }
}
