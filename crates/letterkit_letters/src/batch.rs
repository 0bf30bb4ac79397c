//! Batch orchestration: sort, partition, build one letter per group.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use letterkit_io_docx::{DocxDocument, DocxError, SpecPlaceholderOptions, SpecTableLocateOptions};
use letterkit_text::{C_SLUG_SENTINEL, slugify_or};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::builder::build_letter_from_template;
use crate::conf::N_WORKERS_DEFAULT_MAX;
use crate::spec::{
    DictPlaceholders, DictPlaceholdersByGroup, EnumGroupField, LetterError, ReportLetterBatch,
    SpecGroupError, SpecIndexEntry, SpecLetterBatchOptions, SpecLetterOutput, SpecNormalizedRow,
};

/// Renders the document of one group.
///
/// Implementations are shared across worker threads and must not keep
/// per-group mutable state.
pub trait GroupLetterRender: Sync {
    /// Render `rows` (subject, level, date, description) for `group`.
    fn render(
        &self,
        group: &str,
        rows: &[Vec<String>],
        placeholders: Option<&DictPlaceholders>,
    ) -> Result<Vec<u8>, LetterError>;
}

/// Renderer backed by a parsed DOCX template.
#[derive(Debug, Clone)]
pub struct DocxLetterRender {
    template: DocxDocument,
    n_table_idx_preferred: Option<usize>,
    locate_options: SpecTableLocateOptions,
    placeholder_options: SpecPlaceholderOptions,
}

impl DocxLetterRender {
    pub fn new(template: DocxDocument, options: &SpecLetterBatchOptions) -> Self {
        Self {
            template,
            n_table_idx_preferred: options.n_table_idx_preferred,
            locate_options: options.table_locate.clone(),
            placeholder_options: options.placeholder.clone(),
        }
    }

    /// Parse the template once; an unreadable template fails here, before any group.
    pub fn from_template_bytes(
        v_template: &[u8],
        options: &SpecLetterBatchOptions,
    ) -> Result<Self, DocxError> {
        Ok(Self::new(DocxDocument::from_bytes(v_template)?, options))
    }
}

impl GroupLetterRender for DocxLetterRender {
    fn render(
        &self,
        group: &str,
        rows: &[Vec<String>],
        placeholders: Option<&DictPlaceholders>,
    ) -> Result<Vec<u8>, LetterError> {
        tracing::debug!(group, rows = rows.len(), "building letter");
        build_letter_from_template(
            &self.template,
            rows,
            placeholders,
            self.n_table_idx_preferred,
            &self.locate_options,
            &self.placeholder_options,
        )
    }
}

#[derive(Debug, Clone)]
struct SpecGroupTask<'a> {
    group: &'a str,
    file_name: String,
    rows: Vec<Vec<String>>,
}

/// Generate one letter per group from a DOCX template.
///
/// Fails only when the template itself cannot be loaded; per-group failures
/// are collected in the report.
pub fn generate_letters_per_group(
    rows: &[SpecNormalizedRow],
    v_template: &[u8],
    placeholders: Option<&DictPlaceholdersByGroup>,
    options: &SpecLetterBatchOptions,
) -> Result<ReportLetterBatch, DocxError> {
    let render = DocxLetterRender::from_template_bytes(v_template, options)?;
    Ok(generate_letters_with(rows, &render, placeholders, options))
}

/// Generate one letter per group with any renderer.
///
/// Rows are sorted once by date (missing dates last), partitioned by the
/// configured group field, and rendered per group in parallel. Outputs,
/// errors and the index are ordered by group name.
pub fn generate_letters_with<R: GroupLetterRender + ?Sized>(
    rows: &[SpecNormalizedRow],
    render: &R,
    placeholders: Option<&DictPlaceholdersByGroup>,
    options: &SpecLetterBatchOptions,
) -> ReportLetterBatch {
    let l_sorted = plan_sorted_rows(rows, options.if_newest_first);
    let dict_groups = plan_groups(&l_sorted, options.rule_group_field, &options.group_sentinel);
    let l_names = derive_file_names(dict_groups.keys(), &options.file_prefix, &options.file_ext);

    let l_tasks: Vec<SpecGroupTask> = dict_groups
        .into_iter()
        .zip(l_names)
        .map(|((group, l_rows), file_name)| SpecGroupTask {
            group,
            file_name,
            rows: l_rows.into_iter().map(derive_row_values).collect(),
        })
        .collect();

    let mut report = ReportLetterBatch::default();
    let run_task = |task: &SpecGroupTask| -> Result<Vec<u8>, LetterError> {
        let dict_tokens = placeholders.and_then(|dict| dict.get(task.group));
        render.render(task.group, &task.rows, dict_tokens)
    };

    let n_workers_max = calculate_worker_limit(options.num_workers_max);
    let l_results: Vec<Result<Vec<u8>, LetterError>> = if n_workers_max <= 1 || l_tasks.len() <= 1
    {
        l_tasks.iter().map(run_task).collect()
    } else {
        match ThreadPoolBuilder::new().num_threads(n_workers_max).build() {
            Ok(thread_pool) => thread_pool.install(|| l_tasks.par_iter().map(run_task).collect()),
            Err(err) => {
                let msg = format!(
                    "Failed to initialize thread pool (workers={n_workers_max}): {err}; fallback to serial build."
                );
                tracing::warn!("{msg}");
                report.warnings.push(msg);
                l_tasks.iter().map(run_task).collect()
            }
        }
    };

    for (task, res_render) in l_tasks.into_iter().zip(l_results) {
        match res_render {
            Ok(v_bytes) => {
                report.index.push(SpecIndexEntry {
                    group: task.group.to_string(),
                    n_rows: task.rows.len(),
                });
                report.outputs.push(SpecLetterOutput {
                    group: task.group.to_string(),
                    file_name: task.file_name,
                    n_rows: task.rows.len(),
                    v_bytes,
                });
            }
            Err(err) => {
                tracing::warn!(group = task.group, error = %err, "letter failed");
                report.errors.push(SpecGroupError {
                    group: task.group.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    tracing::info!(
        generated = report.output_count(),
        errors = report.error_count(),
        workers = n_workers_max,
        "letter batch finished"
    );
    report
}

/// Stable date sort; rows without a date stay last in both directions.
pub fn plan_sorted_rows(
    rows: &[SpecNormalizedRow],
    if_newest_first: bool,
) -> Vec<&SpecNormalizedRow> {
    let mut l_sorted: Vec<&SpecNormalizedRow> = rows.iter().collect();
    l_sorted.sort_by(|a, b| match (a.date_ts, b.date_ts) {
        (Some(ts_a), Some(ts_b)) if if_newest_first => ts_b.cmp(&ts_a),
        (Some(ts_a), Some(ts_b)) => ts_a.cmp(&ts_b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    l_sorted
}

/// Partition sorted rows by group key, keeping their relative order.
///
/// Missing or blank keys map to `sentinel`.
pub fn plan_groups<'a>(
    rows: &[&'a SpecNormalizedRow],
    rule_group_field: EnumGroupField,
    sentinel: &'a str,
) -> BTreeMap<&'a str, Vec<&'a SpecNormalizedRow>> {
    let mut dict_groups: BTreeMap<&'a str, Vec<&'a SpecNormalizedRow>> = BTreeMap::new();
    for &row in rows {
        let c_key = match rule_group_field {
            EnumGroupField::Actor => Some(row.actor.as_str()),
            EnumGroupField::Group => row.group.as_deref(),
        }
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(sentinel);
        dict_groups.entry(c_key).or_default().push(row);
    }
    dict_groups
}

/// Letter table values of one row: subject, level, date, description.
pub fn derive_row_values(row: &SpecNormalizedRow) -> Vec<String> {
    vec![
        row.subject.clone(),
        row.level.clone(),
        row.date_display.clone(),
        row.description.clone(),
    ]
}

/// `<prefix><slug><ext>` per group, in order.
///
/// Later groups whose slug collides (case-insensitively) with an earlier one
/// get a `__2`, `__3`... suffix.
pub fn derive_file_names<I>(groups: I, prefix: &str, ext: &str) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut set_taken: HashSet<String> = HashSet::new();
    let mut l_names = Vec::new();
    for group in groups {
        let c_slug = slugify_or(group.as_ref(), C_SLUG_SENTINEL);
        let mut c_name = format!("{prefix}{c_slug}{ext}");
        let mut n_suffix = 2usize;
        while set_taken.contains(&c_name.to_lowercase()) {
            c_name = format!("{prefix}{c_slug}__{n_suffix}{ext}");
            n_suffix += 1;
        }
        set_taken.insert(c_name.to_lowercase());
        l_names.push(c_name);
    }
    l_names
}

/// Worker count: caller value clamped to available parallelism, else up to
/// [`N_WORKERS_DEFAULT_MAX`].
pub fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, N_WORKERS_DEFAULT_MAX),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use letterkit_io_xlsx::EnumRawCell;

    use super::{
        GroupLetterRender, calculate_worker_limit, derive_file_names, generate_letters_per_group,
        generate_letters_with, plan_groups, plan_sorted_rows,
    };
    use crate::builder::tests::{build_docx, build_letter_template, derive_table_texts};
    use crate::spec::{
        DictPlaceholders, DictPlaceholdersByGroup, EnumGroupField, LetterError,
        SpecLetterBatchOptions, SpecNormalizedRow,
    };

    fn derive_row(
        actor: &str,
        group: Option<&str>,
        subject: &str,
        ymd: Option<(i32, u32, u32)>,
    ) -> SpecNormalizedRow {
        let date_ts = ymd
            .and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .and_then(|date| date.and_hms_opt(0, 0, 0));
        SpecNormalizedRow {
            actor: actor.to_string(),
            group: group.map(str::to_string),
            subject: subject.to_string(),
            level: "Alto".to_string(),
            date_raw: EnumRawCell::Empty,
            date_display: date_ts
                .map(|ts| ts.format("%d/%m/%Y").to_string())
                .unwrap_or_default(),
            date_ts,
            description: format!("{subject} result"),
        }
    }

    /// Records the rows each group received; fails for one group.
    struct FakeRender {
        group_failing: &'static str,
    }

    impl GroupLetterRender for FakeRender {
        fn render(
            &self,
            group: &str,
            rows: &[Vec<String>],
            placeholders: Option<&DictPlaceholders>,
        ) -> Result<Vec<u8>, LetterError> {
            if group == self.group_failing {
                return Err(LetterError::NoTargetTable { n_tables: 0 });
            }
            let c_token = placeholders
                .and_then(|dict| dict.get("NAME"))
                .cloned()
                .unwrap_or_default();
            let l_subjects: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
            Ok(format!("{c_token}|{}", l_subjects.join(",")).into_bytes())
        }
    }

    #[test]
    fn plan_sorted_rows_keeps_missing_dates_last() {
        let rows = vec![
            derive_row("A", None, "jan", Some((2024, 1, 1))),
            derive_row("A", None, "none", None),
            derive_row("A", None, "mar", Some((2024, 3, 1))),
        ];
        let l_newest: Vec<&str> = plan_sorted_rows(&rows, true)
            .iter()
            .map(|row| row.subject.as_str())
            .collect();
        assert_eq!(l_newest, vec!["mar", "jan", "none"]);

        let l_oldest: Vec<&str> = plan_sorted_rows(&rows, false)
            .iter()
            .map(|row| row.subject.as_str())
            .collect();
        assert_eq!(l_oldest, vec!["jan", "mar", "none"]);
    }

    #[test]
    fn plan_sorted_rows_is_stable_for_equal_dates() {
        let rows = vec![
            derive_row("A", None, "first", Some((2024, 1, 1))),
            derive_row("A", None, "second", Some((2024, 1, 1))),
            derive_row("A", None, "third", None),
            derive_row("A", None, "fourth", None),
        ];
        let l_subjects: Vec<&str> = plan_sorted_rows(&rows, true)
            .iter()
            .map(|row| row.subject.as_str())
            .collect();
        assert_eq!(l_subjects, vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn plan_groups_uses_sentinel_for_missing_keys() {
        let rows = vec![
            derive_row("Ana", Some("Hábitat"), "s1", None),
            derive_row("", None, "s2", None),
            derive_row("Luis", None, "s3", None),
        ];
        let l_refs: Vec<&SpecNormalizedRow> = rows.iter().collect();

        let dict_actor = plan_groups(&l_refs, EnumGroupField::Actor, "(no group)");
        assert_eq!(
            dict_actor.keys().copied().collect::<Vec<_>>(),
            vec!["(no group)", "Ana", "Luis"]
        );

        let dict_group = plan_groups(&l_refs, EnumGroupField::Group, "(no group)");
        assert_eq!(
            dict_group.keys().copied().collect::<Vec<_>>(),
            vec!["(no group)", "Hábitat"]
        );
        assert_eq!(dict_group["(no group)"].len(), 2);
    }

    #[test]
    fn derive_file_names_slugifies_and_suffixes_collisions() {
        let l_groups = [
            "Secretaría de Hábitat",
            "Secretaria de Habitat",
            "  ",
            "secretaria de habitat",
        ];
        let l_names = derive_file_names(l_groups.iter(), "LETTER_", ".docx");
        assert_eq!(
            l_names,
            vec![
                "LETTER_Secretaria_de_Habitat.docx",
                "LETTER_Secretaria_de_Habitat__2.docx",
                "LETTER_NO_GROUP.docx",
                "LETTER_secretaria_de_habitat__3.docx",
            ]
        );
    }

    #[test]
    fn generate_letters_with_isolates_group_failures() {
        let rows = vec![
            derive_row("Ana", None, "a1", Some((2024, 1, 1))),
            derive_row("Bea", None, "b1", None),
            derive_row("Ana", None, "a2", Some((2024, 3, 1))),
            derive_row("Cruz", None, "c1", Some((2024, 2, 1))),
        ];
        let render = FakeRender { group_failing: "Bea" };
        let report =
            generate_letters_with(&rows, &render, None, &SpecLetterBatchOptions::default());

        assert_eq!(report.output_count(), 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.index.len(), 2);
        assert_eq!(report.errors[0].group, "Bea");
        assert!(report.errors[0].message.contains("4-column table"));

        assert_eq!(report.outputs[0].group, "Ana");
        assert_eq!(report.outputs[0].file_name, "LETTER_Ana.docx");
        assert_eq!(report.outputs[0].v_bytes, b"|a1,a2".to_vec());
        assert_eq!(report.index[0].n_rows, 2);
        assert_eq!(report.outputs[1].group, "Cruz");
    }

    #[test]
    fn generate_letters_with_newest_first_orders_within_group() {
        let rows = vec![
            derive_row("Ana", None, "a1", Some((2024, 1, 1))),
            derive_row("Ana", None, "a0", None),
            derive_row("Ana", None, "a2", Some((2024, 3, 1))),
        ];
        let options = SpecLetterBatchOptions {
            if_newest_first: true,
            ..SpecLetterBatchOptions::default()
        };
        let render = FakeRender { group_failing: "" };
        let report = generate_letters_with(&rows, &render, None, &options);
        assert_eq!(report.outputs[0].v_bytes, b"|a2,a1,a0".to_vec());
    }

    #[test]
    fn generate_letters_with_routes_placeholders_per_group() {
        let rows = vec![
            derive_row("Ana", None, "a1", None),
            derive_row("Luis", None, "l1", None),
        ];
        let dict_by_group = DictPlaceholdersByGroup::from([(
            "Ana".to_string(),
            DictPlaceholders::from([("NAME".to_string(), "Ana P.".to_string())]),
        )]);
        let report = generate_letters_with(
            &rows,
            &FakeRender { group_failing: "" },
            Some(&dict_by_group),
            &SpecLetterBatchOptions::default(),
        );
        assert_eq!(report.outputs[0].v_bytes, b"Ana P.|a1".to_vec());
        assert_eq!(report.outputs[1].v_bytes, b"|l1".to_vec());
    }

    #[test]
    fn generate_letters_with_serial_matches_parallel() {
        let rows: Vec<SpecNormalizedRow> = (0..12)
            .map(|n: u32| {
                let c_actor = format!("actor {}", n % 5);
                derive_row(&c_actor, None, &format!("s{n}"), Some((2024, 1, 1 + n)))
            })
            .collect();
        let render = FakeRender { group_failing: "actor 3" };
        let options_serial = SpecLetterBatchOptions {
            num_workers_max: Some(1),
            ..SpecLetterBatchOptions::default()
        };
        let options_parallel = SpecLetterBatchOptions {
            num_workers_max: Some(4),
            ..SpecLetterBatchOptions::default()
        };
        let report_serial = generate_letters_with(&rows, &render, None, &options_serial);
        let report_parallel = generate_letters_with(&rows, &render, None, &options_parallel);
        assert_eq!(report_serial, report_parallel);
        assert_eq!(report_serial.output_count(), 4);
    }

    #[test]
    fn generate_letters_per_group_builds_docx_letters() {
        let rows = vec![
            derive_row("Ana", Some("Hábitat"), "a1", Some((2024, 3, 15))),
            derive_row("Luis", Some("Hábitat"), "l1", None),
            derive_row("Ana", None, "a2", None),
        ];
        let options = SpecLetterBatchOptions {
            rule_group_field: EnumGroupField::Group,
            ..SpecLetterBatchOptions::default()
        };
        let report = generate_letters_per_group(&rows, &build_letter_template(), None, &options)
            .expect("batch");

        let l_files: Vec<&str> = report.outputs.iter().map(|o| o.file_name.as_str()).collect();
        assert_eq!(l_files, vec!["LETTER_no_group.docx", "LETTER_Habitat.docx"]);
        let l_texts = derive_table_texts(&report.outputs[1].v_bytes, 0);
        assert_eq!(l_texts.len(), 3);
        assert_eq!(l_texts[1], vec!["a1", "Alto", "15/03/2024", "a1 result"]);
        assert_eq!(l_texts[2][0], "l1");
    }

    #[test]
    fn generate_letters_per_group_rejects_unreadable_template() {
        let rows = vec![derive_row("Ana", None, "a1", None)];
        let options = SpecLetterBatchOptions::default();
        let res = generate_letters_per_group(&rows, b"nope", None, &options);
        assert!(res.is_err());
    }

    #[test]
    fn generate_letters_per_group_reports_missing_table_per_group() {
        let rows = vec![derive_row("Ana", None, "a1", None)];
        let v_template = build_docx("<w:p><w:r><w:t>No table here</w:t></w:r></w:p>");
        let options = SpecLetterBatchOptions::default();
        let report =
            generate_letters_per_group(&rows, &v_template, None, &options).expect("batch");
        assert_eq!(report.output_count(), 0);
        assert_eq!(report.errors[0].group, "Ana");
    }

    #[test]
    fn calculate_worker_limit_clamps() {
        assert_eq!(calculate_worker_limit(Some(1)), 1);
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        let n_default = calculate_worker_limit(None);
        assert!((1..=8).contains(&n_default));
    }
}
