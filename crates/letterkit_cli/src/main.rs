use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use letterkit_io_docx::{DocxDocument, list_candidate_tables};
use letterkit_io_xlsx::{SpecRawTable, SpecXlsxWriteOptions, read_dataset};
use letterkit_letters::{
    C_FILE_BUNDLE, C_FILE_INDEX, EnumFieldRole, EnumGroupField, ReportLetterBatch,
    SpecColumnMapperOptions, SpecFieldMapping, SpecLetterBatchOptions, SpecRowFilterOptions,
    auto_detect_group_fields, build_index_workbook, bundle_letters_zip, filter_rows,
    generate_letters_per_group, map_columns, normalize_dataset, read_placeholders,
    validate_mapping,
};
use letterkit_text::normalize_header_text;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "letterkit",
    version,
    about = "Generate one DOCX letter per group from a spreadsheet"
)]
struct Cli {
    /// Dataset workbook (.xlsx)
    #[arg(long, value_name = "PATH")]
    excel: PathBuf,

    /// Letter template (.docx) with a four-column table
    #[arg(long, value_name = "PATH")]
    template: PathBuf,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    out: PathBuf,

    /// Dataset sheet name (default: first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// Grouping: `actor`, `group`, or a dataset column name
    #[arg(long, default_value = "actor")]
    group: String,

    /// Only these actors, separated by `;`
    #[arg(long, value_name = "A;B")]
    actors: Option<String>,

    /// Sort rows newest date first
    #[arg(long)]
    newest_first: bool,

    /// Preferred template table index (0-based)
    #[arg(long)]
    table_index: Option<usize>,

    /// Skip the `Placeholders` sheet
    #[arg(long)]
    no_placeholders: bool,

    /// Also write a ZIP bundle of all letters
    #[arg(long)]
    zip: bool,

    /// Maximum worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Drop repeated rows
    #[arg(long)]
    drop_duplicates: bool,

    /// Drop rows with an empty subject
    #[arg(long)]
    drop_empty_subject: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let report = run(&cli)?;
    for err in &report.errors {
        eprintln!("[{}] {}", err.group, err.message);
    }
    println!("Generated: {}", report.output_count());
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn run(cli: &Cli) -> Result<ReportLetterBatch> {
    let v_xlsx = fs::read(&cli.excel)
        .with_context(|| format!("failed to read dataset {}", cli.excel.display()))?;
    let v_template = fs::read(&cli.template)
        .with_context(|| format!("failed to read template {}", cli.template.display()))?;

    let table = read_dataset(&v_xlsx, cli.sheet.as_deref())?;
    let options_mapper = SpecColumnMapperOptions::default();
    let mapping = map_columns(&table.headers, &options_mapper);
    validate_mapping(&mapping)?;
    tracing::info!(
        suggested = ?auto_detect_group_fields(&table.headers, &options_mapper),
        "group field candidates"
    );

    let (rule_group_field, mapping) = resolve_group_field(&cli.group, &table, mapping)?;
    let rows = normalize_dataset(&table, &mapping)?;
    let options_filter = SpecRowFilterOptions {
        actors_allowed: cli.actors.as_deref().map(parse_actor_list),
        if_drop_empty_subject: cli.drop_empty_subject,
        if_drop_duplicates: cli.drop_duplicates,
    };
    let rows = filter_rows(rows, &options_filter);

    let placeholders = if cli.no_placeholders {
        None
    } else {
        Some(read_placeholders(&v_xlsx))
    };

    let options_batch = SpecLetterBatchOptions {
        rule_group_field,
        if_newest_first: cli.newest_first,
        n_table_idx_preferred: cli.table_index,
        num_workers_max: cli.workers,
        ..SpecLetterBatchOptions::default()
    };
    if let Some(n_idx) = cli.table_index {
        let template = DocxDocument::from_bytes(&v_template)?;
        let n_cols = options_batch.table_locate.n_cols_expected;
        let l_candidates = list_candidate_tables(&template, n_cols);
        if !l_candidates.contains(&n_idx) {
            tracing::warn!(
                table_index = n_idx,
                candidates = ?l_candidates,
                "requested table does not have the expected column count; falling back to discovery"
            );
        }
    }

    let report =
        generate_letters_per_group(&rows, &v_template, placeholders.as_ref(), &options_batch)?;

    write_outputs(&cli.out, &report, cli.zip)?;
    tracing::info!("{report}");
    Ok(report)
}

/// `actor` / `group` keywords, or a column that replaces the mapped group column.
fn resolve_group_field(
    c_group: &str,
    table: &SpecRawTable,
    mapping: SpecFieldMapping,
) -> Result<(EnumGroupField, SpecFieldMapping)> {
    match c_group.trim().to_lowercase().as_str() {
        "actor" => return Ok((EnumGroupField::Actor, mapping)),
        "group" => {
            if mapping.get(EnumFieldRole::Group).is_none() {
                tracing::warn!("no group column detected; every row falls into one group");
            }
            return Ok((EnumGroupField::Group, mapping));
        }
        _ => {}
    }

    let c_target = normalize_header_text(c_group);
    let c_column = table
        .headers
        .iter()
        .find(|c| c.as_str() == c_group)
        .or_else(|| {
            table
                .headers
                .iter()
                .find(|c| normalize_header_text(c) == c_target)
        })
        .ok_or_else(|| {
            anyhow!(
                "group column `{c_group}` not found (available: {})",
                table.headers.join(", ")
            )
        })?;
    Ok((
        EnumGroupField::Group,
        mapping.with_role(EnumFieldRole::Group, Some(c_column.as_str())),
    ))
}

fn parse_actor_list(c_actors: &str) -> BTreeSet<String> {
    c_actors
        .split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn write_outputs(path_dir_out: &Path, report: &ReportLetterBatch, if_zip: bool) -> Result<()> {
    fs::create_dir_all(path_dir_out)
        .with_context(|| format!("failed to create {}", path_dir_out.display()))?;

    for output in &report.outputs {
        let path_file = path_dir_out.join(&output.file_name);
        fs::write(&path_file, &output.v_bytes)
            .with_context(|| format!("failed to write {}", path_file.display()))?;
    }

    let v_index = build_index_workbook(report, &SpecXlsxWriteOptions::default())
        .map_err(|msg| anyhow!("failed to build index workbook: {msg}"))?;
    let path_index = path_dir_out.join(C_FILE_INDEX);
    fs::write(&path_index, v_index)
        .with_context(|| format!("failed to write {}", path_index.display()))?;

    if if_zip {
        let v_zip = bundle_letters_zip(&report.outputs).context("failed to build zip bundle")?;
        let path_zip = path_dir_out.join(C_FILE_BUNDLE);
        fs::write(&path_zip, v_zip)
            .with_context(|| format!("failed to write {}", path_zip.display()))?;
    }
    Ok(())
}
