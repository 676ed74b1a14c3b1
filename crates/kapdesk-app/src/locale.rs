// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Process-wide label lookup for the two supported locales.
//!
//! Both tables are parsed in full by [`init`]; [`toggle`] swaps the active
//! table and the text direction together. Lookups go through [`t`], which
//! falls back to the canonical English label.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const EN_TABLE: &str = include_str!("../locales/en.toml");
const AR_TABLE: &str = include_str!("../locales/ar.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "ar" => Some(Self::Ar),
            _ => None,
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::En => Direction::Ltr,
            Self::Ar => Direction::Rtl,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::En => Self::Ar,
            Self::Ar => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTables {
    en: HashMap<String, String>,
    ar: HashMap<String, String>,
}

impl LocaleTables {
    pub fn load() -> Result<Self> {
        Ok(Self {
            en: parse_table(EN_TABLE).context("parse en locale table")?,
            ar: parse_table(AR_TABLE).context("parse ar locale table")?,
        })
    }

    pub fn table(&self, locale: Locale) -> &HashMap<String, String> {
        match locale {
            Locale::En => &self.en,
            Locale::Ar => &self.ar,
        }
    }
}

fn parse_table(raw: &str) -> Result<HashMap<String, String>> {
    let table: HashMap<String, String> = toml::from_str(raw)?;
    Ok(table)
}

/// An active locale plus both tables; the global accessor wraps one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    active: Locale,
    tables: Arc<LocaleTables>,
}

impl Catalog {
    pub fn new(tables: LocaleTables, active: Locale) -> Self {
        Self {
            active,
            tables: Arc::new(tables),
        }
    }

    pub fn active(&self) -> Locale {
        self.active
    }

    pub fn direction(&self) -> Direction {
        self.active.direction()
    }

    pub fn set(&mut self, locale: Locale) {
        self.active = locale;
    }

    pub fn toggle(&mut self) -> Locale {
        self.active = self.active.other();
        self.active
    }

    /// Exact entries win. Otherwise the most specific `{}` template whose
    /// fixed text surrounds the label is used, with the captured part
    /// translated in turn.
    pub fn lookup(&self, label: &str) -> String {
        let table = self.tables.table(self.active);
        if let Some(found) = table.get(label) {
            return found.clone();
        }
        table
            .iter()
            .filter_map(|(key, value)| {
                let (prefix, suffix) = key.split_once(TEMPLATE_SLOT)?;
                let argument = label.strip_prefix(prefix)?.strip_suffix(suffix)?;
                if argument.is_empty() {
                    return None;
                }
                Some((prefix.len() + suffix.len(), value, argument))
            })
            .max_by_key(|(fixed, _, _)| *fixed)
            .map(|(_, value, argument)| value.replacen(TEMPLATE_SLOT, &self.argument(argument), 1))
            .unwrap_or_else(|| label.to_owned())
    }

    /// Captured text is usually an entity noun in lower case ("sector",
    /// "sector users"); retry it title-cased before giving up.
    fn argument(&self, raw: &str) -> String {
        let direct = self.lookup(raw);
        if direct != raw {
            return direct;
        }
        let titled = title_words(raw);
        let retried = self.lookup(&titled);
        if retried != titled { retried } else { raw.to_owned() }
    }
}

const TEMPLATE_SLOT: &str = "{}";

fn title_words(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

static CATALOG: RwLock<Option<Catalog>> = RwLock::new(None);

fn with_catalog<T>(f: impl FnOnce(&Catalog) -> T) -> Option<T> {
    let guard = match CATALOG.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.as_ref().map(f)
}

fn with_catalog_mut<T>(f: impl FnOnce(&mut Catalog) -> T) -> Option<T> {
    let mut guard = match CATALOG.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.as_mut().map(f)
}

pub fn init(locale: Locale) -> Result<()> {
    let catalog = Catalog::new(LocaleTables::load()?, locale);
    let mut guard = match CATALOG.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Some(catalog);
    Ok(())
}

pub fn t(label: &str) -> String {
    with_catalog(|catalog| catalog.lookup(label)).unwrap_or_else(|| label.to_owned())
}

pub fn active() -> Locale {
    with_catalog(Catalog::active).unwrap_or_default()
}

pub fn direction() -> Direction {
    active().direction()
}

pub fn set(locale: Locale) {
    with_catalog_mut(|catalog| catalog.set(locale));
}

/// Flips between the two locales; returns the new one.
pub fn toggle() -> Locale {
    with_catalog_mut(Catalog::toggle).unwrap_or_default()
}
