//! Decoding and validating `application/x-www-form-urlencoded` submissions.
//!
//! Bodies are decoded into a [`FormData`] multimap (repeated keys carry
//! multi-select values), and each form type checks its own fields into a
//! [`FormErrors`] map that templates render next to the offending inputs.

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use infra::ids::Id;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

/// A selectable option for a model-backed choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice<T> {
    pub id: Id<T>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// The single-field form used to rename dish types and ingredients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameForm {
    pub name: String,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        let pairs = url::form_urlencoded::parse(body).into_owned().collect();
        FormData { pairs }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        FormData { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// A text input's value with surrounding whitespace stripped.
    pub fn text(&self, name: &str) -> String {
        self.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// Like `text`, but verbatim; used for passwords.
    pub fn raw(&self, name: &str) -> String {
        self.get(name).map(str::to_string).unwrap_or_default()
    }
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// `Ok(value)` when nothing was reported, otherwise the errors.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl NameForm {
    pub const MAX_LENGTH: usize = 255;

    pub fn from_data(data: &FormData) -> Self {
        NameForm {
            name: data.text("name"),
        }
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        required_text(&mut errors, "name", &self.name, Self::MAX_LENGTH);
        errors.into_result(|| self.name.clone())
    }
}

pub fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Checks presence and length of an already trimmed value.
pub fn required_text(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        optional_text(errors, field, value, max);
    }
}

pub fn optional_text(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(field, max_length_message(max, len));
    }
}

/// Parses a whole number; blank input yields `None` without complaint, so
/// callers decide whether the field is required.
pub fn integer(errors: &mut FormErrors, field: &str, raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

/// A whole number that must fit a postgres `INTEGER` column.
pub fn int32(errors: &mut FormErrors, field: &str, raw: &str) -> Option<i32> {
    let n = integer(errors, field, raw)?;
    match i32::try_from(n) {
        Ok(n) => Some(n),
        Err(_) if n > 0 => {
            errors.add(
                field,
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
        Err(_) => {
            errors.add(
                field,
                format!("Ensure this value is greater than or equal to {}.", i32::MIN),
            );
            None
        }
    }
}

/// Parses a fixed-point number constrained the same way as a
/// `NUMERIC(max_digits, decimal_places)` column.
pub fn decimal(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
    max_digits: u32,
    decimal_places: u32,
) -> Option<Decimal> {
    if raw.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let value = match Decimal::from_str(raw) {
        Ok(value) => value,
        Err(_) => {
            errors.add(field, "Enter a number.");
            return None;
        }
    };

    let decimals = value.scale();
    let mut mantissa = value.mantissa().unsigned_abs();
    let mut significant = 0u32;
    while mantissa > 0 {
        significant += 1;
        mantissa /= 10;
    }
    // Leading zeros after the point ("0.05") still occupy decimal places.
    let digits = significant.max(decimals);
    let whole_digits = digits - decimals;

    if digits > max_digits {
        errors.add(
            field,
            format!(
                "Ensure that there are no more than {} digits in total.",
                max_digits
            ),
        );
        None
    } else if decimals > decimal_places {
        errors.add(
            field,
            format!(
                "Ensure that there are no more than {} decimal places.",
                decimal_places
            ),
        );
        None
    } else if whole_digits > max_digits - decimal_places {
        errors.add(
            field,
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                max_digits - decimal_places
            ),
        );
        None
    } else {
        Some(value)
    }
}

pub fn choice<T>(
    errors: &mut FormErrors,
    field: &str,
    raw: &str,
    available: &[Choice<T>],
) -> Option<Id<T>> {
    if raw.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    let found = raw
        .parse::<Id<T>>()
        .ok()
        .filter(|id| available.iter().any(|c| c.id == *id));
    if found.is_none() {
        errors.add(field, INVALID_CHOICE);
    }
    found
}

/// Resolves a multi-select. Every submitted value must name an available
/// choice; duplicates collapse.
pub fn multiple_choice<T>(
    errors: &mut FormErrors,
    field: &str,
    raw: &[String],
    available: &[Choice<T>],
    required: bool,
) -> Vec<Id<T>> {
    let values = raw
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>();
    if values.is_empty() {
        if required {
            errors.add(field, REQUIRED);
        }
        return Vec::new();
    }

    let mut ids = Vec::with_capacity(values.len());
    for value in values {
        let id = match value.parse::<Id<T>>() {
            Ok(id) => id,
            Err(_) => {
                errors.add(field, format!("“{}” is not a valid value.", value));
                return Vec::new();
            }
        };
        if !available.iter().any(|c| c.id == id) {
            errors.add(
                field,
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    value
                ),
            );
            return Vec::new();
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

pub fn options<T>(choices: &[Choice<T>], selected: &[String]) -> Vec<SelectOption> {
    choices
        .iter()
        .map(|c| {
            let value = c.id.to_string();
            let selected = selected.iter().any(|s| s.trim() == value);
            SelectOption {
                value,
                label: c.label.clone(),
                selected,
            }
        })
        .collect()
}
