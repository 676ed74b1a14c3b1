// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dispatch::{FormPart, PartValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Password,
    Number,
    /// `(value, label)` pairs; the first entry is the default.
    Select(&'static [(&'static str, &'static str)]),
    /// A local file path, uploaded as a multipart file part.
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: true,
        }
    }

    pub const fn optional(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: false,
        }
    }

    /// Whether a keystroke may be typed into this field; number fields take
    /// digits only.
    pub fn accepts(&self, ch: char) -> bool {
        match self.kind {
            FieldKind::Number => ch.is_ascii_digit(),
            FieldKind::Select(_) => false,
            _ => !ch.is_control(),
        }
    }
}

/// Local draft values bound to a modal form, keyed by field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    values: BTreeMap<&'static str, String>,
}

impl Draft {
    pub fn blank(fields: &[FieldSpec]) -> Self {
        let values = fields
            .iter()
            .map(|field| {
                let initial = match field.kind {
                    FieldKind::Select(options) => options
                        .first()
                        .map(|(value, _)| (*value).to_owned())
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                (field.key, initial)
            })
            .collect();
        Self { values }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn trimmed(&self, key: &str) -> &str {
        self.get(key).trim()
    }

    pub fn push_char(&mut self, key: &'static str, ch: char) {
        self.values.entry(key).or_default().push(ch);
    }

    pub fn pop_char(&mut self, key: &'static str) {
        if let Some(value) = self.values.get_mut(key) {
            value.pop();
        }
    }

    /// Steps a select field through its options, wrapping at both ends.
    pub fn cycle_option(&mut self, field: &FieldSpec, delta: isize) {
        let FieldKind::Select(options) = field.kind else {
            return;
        };
        if options.is_empty() {
            return;
        }
        let current = options
            .iter()
            .position(|(value, _)| *value == self.get(field.key))
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(options.len() as isize) as usize;
        self.set(field.key, options[next].0);
    }

    /// Presence check for required fields; the first gap wins.
    pub fn validate(&self, fields: &[FieldSpec]) -> Result<()> {
        if let Some(field) = fields
            .iter()
            .find(|field| field.required && self.trimmed(field.key).is_empty())
        {
            bail!("{} is required", field.label);
        }
        Ok(())
    }

    /// JSON object of every non-file field; number fields become numbers and
    /// blank optional fields are left out.
    pub fn to_json(&self, fields: &[FieldSpec]) -> Value {
        let mut object = Map::new();
        for field in fields {
            let raw = self.trimmed(field.key);
            if raw.is_empty() || field.kind == FieldKind::File {
                continue;
            }
            let value = match field.kind {
                FieldKind::Number => raw
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(raw)),
                _ => Value::from(raw),
            };
            object.insert(field.key.to_owned(), value);
        }
        Value::Object(object)
    }

    /// Multipart parts for upload endpoints; file fields are read from disk.
    pub fn to_multipart(&self, fields: &[FieldSpec]) -> Result<Vec<FormPart>> {
        let mut parts = Vec::new();
        for field in fields {
            let raw = self.trimmed(field.key);
            if raw.is_empty() {
                continue;
            }
            if field.kind == FieldKind::File {
                parts.push(file_part(field.key, Path::new(raw))?);
            } else {
                parts.push(FormPart::text(field.key, raw));
            }
        }
        Ok(parts)
    }
}

pub fn has_file_value(draft: &Draft, fields: &[FieldSpec]) -> bool {
    fields
        .iter()
        .any(|field| field.kind == FieldKind::File && !draft.trimmed(field.key).is_empty())
}

fn file_part(name: &str, path: &Path) -> Result<FormPart> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read upload {} -- check the file path", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_owned();
    Ok(FormPart {
        name: name.to_owned(),
        value: PartValue::File {
            mime_type: mime_for(&file_name).to_owned(),
            file_name,
            bytes,
        },
    })
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// One open modal: which fields, their draft values, focus and the inline
/// error shown under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState<I> {
    pub title: String,
    pub intent: I,
    pub fields: &'static [FieldSpec],
    pub draft: Draft,
    pub focus: usize,
    pub error: Option<String>,
}

impl<I> FormState<I> {
    pub fn new(
        title: impl Into<String>,
        intent: I,
        fields: &'static [FieldSpec],
        draft: Draft,
    ) -> Self {
        Self {
            title: title.into(),
            intent,
            fields,
            draft,
            focus: 0,
            error: None,
        }
    }

    pub fn focused_field(&self) -> Option<&'static FieldSpec> {
        self.fields.get(self.focus)
    }

    pub fn move_focus(&mut self, delta: isize) {
        if self.fields.is_empty() {
            return;
        }
        let len = self.fields.len() as isize;
        self.focus = (self.focus as isize + delta).rem_euclid(len) as usize;
    }

    pub fn type_char(&mut self, ch: char) {
        if let Some(field) = self.focused_field()
            && field.accepts(ch)
        {
            self.draft.push_char(field.key, ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.focused_field() {
            self.draft.pop_char(field.key);
        }
    }

    pub fn cycle_option(&mut self, delta: isize) {
        if let Some(field) = self.focused_field() {
            self.draft.cycle_option(field, delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Draft, FieldKind, FieldSpec, FormState, has_file_value};
    use crate::dispatch::PartValue;
    use serde_json::json;

    const OPTIONS: &[(&str, &str)] = &[("low", "Low"), ("high", "High")];

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("name", "Name", FieldKind::Text),
        FieldSpec::required("email", "Email", FieldKind::Email),
        FieldSpec::optional("floor", "Floor", FieldKind::Number),
        FieldSpec::optional("priority", "Priority", FieldKind::Select(OPTIONS)),
        FieldSpec::optional("logo", "Logo", FieldKind::File),
    ];

    #[test]
    fn blank_draft_defaults_selects_to_first_option() {
        let draft = Draft::blank(FIELDS);
        assert_eq!(draft.get("priority"), "low");
        assert_eq!(draft.get("name"), "");
    }

    #[test]
    fn validation_names_first_missing_required_field() {
        let draft = Draft::blank(FIELDS).with("name", "Water");
        let error = draft.validate(FIELDS).expect_err("email missing");
        assert_eq!(error.to_string(), "Email is required");

        let whitespace = Draft::blank(FIELDS).with("name", "   ").with("email", "a@b");
        let error = whitespace.validate(FIELDS).expect_err("blank name");
        assert_eq!(error.to_string(), "Name is required");

        let complete = Draft::blank(FIELDS).with("name", "Water").with("email", "a@b");
        assert!(complete.validate(FIELDS).is_ok());
    }

    #[test]
    fn json_body_skips_blank_and_file_fields() {
        let draft = Draft::blank(FIELDS)
            .with("name", " Water ")
            .with("email", "w@kap.gov")
            .with("floor", "3")
            .with("logo", "/tmp/logo.png");
        assert_eq!(
            draft.to_json(FIELDS),
            json!({"name": "Water", "email": "w@kap.gov", "floor": 3, "priority": "low"})
        );
    }

    #[test]
    fn multipart_reads_file_fields() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logo.PNG");
        std::fs::write(&path, [1_u8, 2, 3])?;
        let draft = Draft::blank(FIELDS)
            .with("name", "Water")
            .with("logo", path.to_string_lossy());
        assert!(has_file_value(&draft, FIELDS));

        let parts = draft.to_multipart(FIELDS)?;
        let logo = parts
            .iter()
            .find(|part| part.name == "logo")
            .expect("logo part");
        assert_eq!(
            logo.value,
            PartValue::File {
                file_name: "logo.PNG".to_owned(),
                mime_type: "image/png".to_owned(),
                bytes: vec![1, 2, 3],
            }
        );
        Ok(())
    }

    #[test]
    fn missing_upload_reports_path() {
        let draft = Draft::blank(FIELDS).with("logo", "/definitely/missing.png");
        let error = draft.to_multipart(FIELDS).expect_err("missing file");
        assert!(error.to_string().contains("/definitely/missing.png"));
    }

    #[test]
    fn form_state_routes_keys_to_focused_field() {
        let mut form = FormState::new("Add", (), FIELDS, Draft::blank(FIELDS));
        form.type_char('W');
        form.move_focus(2);
        form.type_char('x');
        form.type_char('7');
        form.move_focus(1);
        form.cycle_option(1);
        form.move_focus(-4);
        form.backspace();

        assert_eq!(form.draft.get("name"), "");
        assert_eq!(form.draft.get("floor"), "7");
        assert_eq!(form.draft.get("priority"), "high");
    }
}
