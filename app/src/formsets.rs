//! Bulk entry of single-name records.
//!
//! The browser submits a management block (`form-TOTAL_FORMS`,
//! `form-INITIAL_FORMS`) and one `form-<i>-name` input per row. Blank rows
//! are ignored; any error anywhere rejects the whole batch.

use serde::Serialize;

use crate::forms::{self, FormData, FormErrors};

pub const PREFIX: &str = "form";
pub const MAX_NUM_FORMS: usize = 1000;

const DUPLICATE_ROW: &str = "Please correct the duplicate values below.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRow {
    pub prefix: String,
    pub name: String,
    pub errors: FormErrors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameFormset {
    pub total_forms: usize,
    pub initial_forms: usize,
    pub max_num_forms: usize,
    pub rows: Vec<NameRow>,
    pub non_form_errors: Vec<String>,
}

fn management_field(name: &str) -> String {
    format!("{}-{}", PREFIX, name)
}

fn row_prefix(i: usize) -> String {
    format!("{}-{}", PREFIX, i)
}

impl NameRow {
    fn new(i: usize, name: String) -> Self {
        NameRow {
            prefix: row_prefix(i),
            name,
            errors: FormErrors::default(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
    }
}

impl NameFormset {
    /// An unbound formset with `extra` empty rows.
    pub fn blank(extra: usize) -> Self {
        NameFormset {
            total_forms: extra,
            initial_forms: 0,
            max_num_forms: MAX_NUM_FORMS,
            rows: (0..extra).map(|i| NameRow::new(i, String::new())).collect(),
            non_form_errors: Vec::new(),
        }
    }

    pub fn bind(data: &FormData, max_length: usize) -> Self {
        let mut formset = NameFormset::blank(0);

        let mut missing = Vec::new();
        let mut management = |field: &str| {
            let key = management_field(field);
            let value = data.get(&key).and_then(|v| v.trim().parse::<usize>().ok());
            if value.is_none() {
                missing.push(key);
            }
            value.unwrap_or(0)
        };
        let total = management("TOTAL_FORMS");
        let initial = management("INITIAL_FORMS");
        if !missing.is_empty() {
            formset.non_form_errors.push(format!(
                "ManagementForm data is missing or has been tampered with. Missing fields: {}.",
                missing.join(", ")
            ));
            return formset;
        }

        if total > MAX_NUM_FORMS {
            formset
                .non_form_errors
                .push(format!("Please submit at most {} forms.", MAX_NUM_FORMS));
        }
        let total = total.min(MAX_NUM_FORMS);
        formset.total_forms = total;
        formset.initial_forms = initial.min(total);
        for i in 0..total {
            let name = data.text(&format!("{}-name", row_prefix(i)));
            let mut row = NameRow::new(i, name);
            if !row.is_blank() {
                forms::optional_text(&mut row.errors, "name", &row.name, max_length);
            }
            formset.rows.push(row);
        }
        formset
    }

    /// Flag rows that repeat a name given earlier in the same batch.
    pub fn require_unique_names(&mut self) {
        let mut seen: Vec<&str> = Vec::new();
        let mut duplicates = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            if row.is_blank() || row.errors.has("name") {
                continue;
            }
            if seen.contains(&row.name.as_str()) {
                duplicates.push(i);
            } else {
                seen.push(&row.name);
            }
        }
        if duplicates.is_empty() {
            return;
        }
        for i in duplicates {
            self.rows[i].errors.add_non_field(DUPLICATE_ROW);
        }
        self.non_form_errors
            .push("Please correct the duplicate data for name, which must be unique.".into());
    }

    /// Flag rows whose name already exists in storage.
    pub fn mark_taken(&mut self, taken: &[String], message: &str) {
        for row in self.rows.iter_mut() {
            if !row.is_blank() && taken.contains(&row.name) {
                row.errors.add("name", message);
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.non_form_errors.is_empty() && self.rows.iter().all(|r| r.errors.is_empty())
    }

    /// The names to save, in submission order.
    pub fn names(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| !r.is_blank())
            .map(|r| r.name.clone())
            .collect()
    }
}
