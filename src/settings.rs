//! Reader for the ini-like property database. Keys are exposed as `"<section>/<key>"`, top level
//! keys as just `"<key>"`.

use std::{collections::HashMap, fs, path::Path};

use nom::{
    bytes::complete::{take_till1, take_until},
    character::complete::{char as C, space0},
    combinator::{all_consuming, rest},
    sequence::{delimited, separated_pair, terminated},
    IResult,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Settings {
    // Insertion ordered
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

enum Line<'a> {
    Section(&'a str),
    Pair(&'a str, &'a str),
}

fn section(line: &str) -> IResult<&str, &str> {
    all_consuming(terminated(delimited(C('['), take_until("]"), C(']')), space0))(line)
}

fn pair(line: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till1(|c: char| c == '='), C('='), rest)(line)
}

fn parse_line(line: &str) -> Option<Line<'_>> {
    if let Ok((_, name)) = section(line) {
        return Some(Line::Section(name.trim()));
    }
    pair(line)
        .ok()
        .map(|(_, (key, value))| Line::Pair(key.trim(), value.trim()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split on commas outside of double quotes
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in value.chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl Settings {
    pub fn parse(contents: &str) -> Result<Self> {
        let mut settings = Settings::default();
        let mut group = String::new();

        for (i, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Some(Line::Section(name)) if name.eq_ignore_ascii_case("general") => {
                    group.clear()
                }
                Some(Line::Section(name)) => group = name.to_ascii_lowercase(),
                Some(Line::Pair(key, value)) => {
                    let key = if group.is_empty() {
                        key.to_string()
                    } else {
                        format!("{group}/{key}")
                    };
                    settings.insert(key, value.to_string());
                }
                None => {
                    return Err(Error::Settings {
                        line: i + 1,
                        reason: format!("expected [section] or key=value, got {line:?}"),
                    })
                }
            }
        }

        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    // Later duplicates replace the value but keep the original position
    fn insert(&mut self, key: String, value: String) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&i| unquote(self.entries[i].1.as_str()))
    }

    pub fn value_list(&self, key: &str) -> Option<Vec<String>> {
        self.index
            .get(key)
            .map(|&i| split_list(&self.entries[i].1))
    }

    /// Keys of a group, in file order, without the group prefix
    pub fn group_keys<'a>(&'a self, group: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = format!("{group}/");
        self.entries
            .iter()
            .filter_map(move |(key, _)| key.strip_prefix(prefix.as_str()))
    }

    /// All group names, in file order
    pub fn groups(&self) -> Vec<&str> {
        let mut groups = Vec::new();
        for (key, _) in &self.entries {
            if let Some((group, _)) = key.split_once('/') {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        groups
    }
}
