//! tabedit CLI
//!
//! Command-line tool for previewing, editing, combining and profiling tabular files.

use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};
use tabedit_core::{
    scan_directory, write_csv, CastType, CleanOptions, EditSpec, Pipeline, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "tabedit")]
#[command(about = "Preview, edit and combine CSV, XLSX and delimited text tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the first rows of a table
    Preview {
        /// Table file (csv, xlsx or txt)
        file: PathBuf,

        /// Number of rows to show (defaults to the configured preview size)
        #[arg(short, long)]
        rows: Option<usize>,

        /// Render as an HTML table
        #[arg(long, conflicts_with = "json")]
        html: bool,

        /// Print the preview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply column edits and row cleaning, then write the result as CSV
    Edit {
        /// Table file (csv, xlsx or txt)
        file: PathBuf,

        /// Rename a column by position (POSITION=NAME)
        #[arg(long, value_parser = parse_rename)]
        rename: Vec<(usize, String)>,

        /// Cast a column by position (POSITION=int|float|str)
        #[arg(long, value_parser = parse_retype)]
        retype: Vec<(usize, CastType)>,

        /// Delete a column by name
        #[arg(short, long)]
        delete: Vec<String>,

        /// Drop duplicate rows, then rows containing nulls
        #[arg(long)]
        clean: bool,

        /// Drop duplicate rows only
        #[arg(long)]
        drop_duplicates: bool,

        /// Drop rows containing nulls only
        #[arg(long)]
        drop_nulls: bool,

        /// Read the edits from a JSON file; command-line edits are added on top
        #[arg(long)]
        spec: Option<PathBuf>,

        /// Output path (defaults to the source for CSV, else the same name with .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Combine tables with identical columns and types
    Combine {
        /// Table files, in order
        #[arg(required = true, num_args = 1..)]
        files: Vec<PathBuf>,

        /// Write the combined table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show column types, null counts and numeric statistics
    Profile {
        /// Table file (csv, xlsx or txt)
        file: PathBuf,

        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// List loadable tables under directories
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Create an edit file template
    CreateSpec {
        /// Output path for the edit file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> tabedit_core::Result<()> {
    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let pipeline = Pipeline::new(config);

    match cli.command {
        Commands::Preview {
            file,
            rows,
            html,
            json,
        } => cmd_preview(&pipeline, &file, rows, html, json),
        Commands::Edit {
            file,
            rename,
            retype,
            delete,
            clean,
            drop_duplicates,
            drop_nulls,
            spec,
            output,
        } => {
            let mut edits = match spec {
                Some(path) => EditSpec::load(path)?,
                None => EditSpec::new(),
            };
            for (position, name) in rename {
                edits = edits.rename(position, name);
            }
            for (position, target) in retype {
                edits = edits.retype(position, target);
            }
            for name in delete {
                edits = edits.delete(name);
            }
            let clean = CleanOptions {
                drop_duplicates: edits.clean.drop_duplicates || clean || drop_duplicates,
                drop_nulls: edits.clean.drop_nulls || clean || drop_nulls,
            };
            cmd_edit(&pipeline, &file, &edits.clean(clean), output.as_deref())
        }
        Commands::Combine { files, output } => cmd_combine(&pipeline, &files, output.as_deref()),
        Commands::Profile { file, json } => cmd_profile(&pipeline, &file, json),
        Commands::Scan { root } => cmd_scan(&root),
        Commands::CreateSpec { output } => cmd_create_spec(&output),
    }
}

fn cmd_preview(
    pipeline: &Pipeline,
    file: &Path,
    rows: Option<usize>,
    html: bool,
    json: bool,
) -> tabedit_core::Result<()> {
    let table = pipeline.load(file)?;
    let preview = tabedit_core::Preview::of(
        &table,
        rows.unwrap_or(pipeline.config().preview_rows),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else if html {
        println!("{}", preview.to_html());
    } else {
        println!("File: {}", file.display());
        println!("Columns: {}", table.column_count());
        println!("Rows: {}", table.row_count());
        println!();
        print!("{}", preview.to_text());
    }

    Ok(())
}

fn cmd_edit(
    pipeline: &Pipeline,
    file: &Path,
    spec: &EditSpec,
    output: Option<&Path>,
) -> tabedit_core::Result<()> {
    let (output, report) = pipeline.edit_file(file, spec, output)?;

    if !report.warnings.is_empty() {
        println!("Warning: {} edits could not be applied:", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    print!("{}", report.preview.to_text());
    println!();
    println!(
        "Wrote {} rows x {} columns to {}",
        report.table.row_count(),
        report.table.column_count(),
        output.display()
    );

    Ok(())
}

fn cmd_combine(
    pipeline: &Pipeline,
    files: &[PathBuf],
    output: Option<&Path>,
) -> tabedit_core::Result<()> {
    let combined = pipeline.combine_files(files)?;

    print!("{}", combined.preview.to_text());

    if let Some(output) = output {
        write_csv(&combined.table, output)?;
        println!();
        println!(
            "Combined {} files into {} rows at {}",
            files.len(),
            combined.table.row_count(),
            output.display()
        );
    }

    Ok(())
}

fn cmd_profile(pipeline: &Pipeline, file: &Path, json: bool) -> tabedit_core::Result<()> {
    let table = pipeline.load(file)?;
    let profile = tabedit_core::profile_table(&table);

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Rows: {}  Columns: {}", profile.row_count, profile.column_count);
    println!();
    println!("{:<24} {:<8} {:>6}", "column", "type", "nulls");
    for column in &profile.columns {
        println!("{:<24} {:<8} {:>6}", column.name, column.dtype.to_string(), column.null_count);
    }

    let numeric: Vec<_> = profile
        .columns
        .iter()
        .filter_map(|c| c.stats.as_ref().map(|s| (c, s)))
        .collect();
    if !numeric.is_empty() {
        println!();
        println!(
            "{:<24} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for (column, s) in numeric {
            let std = s.std.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "NaN".to_string());
            println!(
                "{:<24} {:>8} {:>12.4} {:>12} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                column.name, s.count, s.mean, std, s.min, s.q25, s.median, s.q75, s.max
            );
        }
    }

    Ok(())
}

fn cmd_scan(roots: &[PathBuf]) -> tabedit_core::Result<()> {
    let result = scan_directory(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!("Found {} tables:", result.files.len());
    for file in &result.files {
        println!("  [{}] {}", file.format, file.path.display());
    }

    Ok(())
}

fn cmd_create_spec(output: &Path) -> tabedit_core::Result<()> {
    let spec = EditSpec::new()
        .rename(0, "NewName")
        .retype(1, CastType::Float)
        .delete("ColumnToDelete")
        .clean(CleanOptions::all());

    spec.save(output)?;
    info!("Created edit file {}", output.display());
    println!();
    println!("Edit the file to describe your changes, then run:");
    println!("  tabedit edit <file> --spec {}", output.display());

    Ok(())
}

fn parse_rename(s: &str) -> Result<(usize, String), String> {
    let (position, name) = split_positional(s)?;
    if name.is_empty() {
        return Err("new name must not be empty".to_string());
    }
    Ok((position, name.to_string()))
}

fn parse_retype(s: &str) -> Result<(usize, CastType), String> {
    let (position, target) = split_positional(s)?;
    let target = target.parse::<CastType>().map_err(|e| e.to_string())?;
    Ok((position, target))
}

fn split_positional(s: &str) -> Result<(usize, &str), String> {
    let (position, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected POSITION=VALUE, got '{}'", s))?;
    let position = position
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid column position '{}'", position))?;
    Ok((position, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positional_edits() {
        assert_eq!(parse_rename("0=ID").unwrap(), (0, "ID".to_string()));
        assert_eq!(parse_retype("2 = float").unwrap(), (2, CastType::Float));
        assert!(parse_rename("x=ID").is_err());
        assert!(parse_rename("0=").is_err());
        assert!(parse_retype("1=date").is_err());
        assert!(parse_retype("1").is_err());
    }

    #[test]
    fn test_combine_accepts_a_single_file() {
        let cli = Cli::try_parse_from(["tabedit", "combine", "a.csv", "-o", "out.csv"]).unwrap();
        match cli.command {
            Commands::Combine { files, output } => {
                assert_eq!(files, vec![PathBuf::from("a.csv")]);
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            _ => panic!("expected combine command"),
        }
        assert!(Cli::try_parse_from(["tabedit", "combine"]).is_err());
    }

    #[test]
    fn test_edit_command_arguments() {
        let cli = Cli::try_parse_from([
            "tabedit", "edit", "a.csv", "--rename", "0=ID", "--retype", "1=int", "-d", "id",
            "--clean",
        ])
        .unwrap();

        match cli.command {
            Commands::Edit {
                rename,
                retype,
                delete,
                clean,
                ..
            } => {
                assert_eq!(rename, vec![(0, "ID".to_string())]);
                assert_eq!(retype, vec![(1, CastType::Int)]);
                assert_eq!(delete, vec!["id"]);
                assert!(clean);
            }
            _ => panic!("expected edit command"),
        }
    }
}
