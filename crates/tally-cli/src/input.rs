//! Dataset loading: JSON, TOML or a line-oriented text format.
//!
//! Text format, one group per line:
//!
//! ```text
//! # comment
//! Lagos@Southern: 12 15 9 14
//! Kano@Northern:  3, 4, 2, 5
//! ```
//!
//! A file with no `name:` prefixes at all is a flat dataset whose numbers
//! form a single group. Stdin has no extension, so JSON is recognised there
//! by a leading `{`.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use tally_core::{Dataset, Group};

/// Name given to the single group of a flat dataset.
pub const FLAT_GROUP: &str = "readings";

/// Load a dataset from `path`, or from stdin when `path` is `-`.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return parse_stdin(&text).context("parsing stdin");
    }

    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    let dataset = match ext.as_deref() {
        Some("json") => serde_json::from_str(&content).map_err(anyhow::Error::from),
        Some("toml") => toml::from_str(&content).map_err(anyhow::Error::from),
        _ => parse_text(&content),
    }
    .with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!(path = %path.display(), groups = dataset.len(), "loaded dataset");
    Ok(dataset)
}

fn parse_stdin(text: &str) -> Result<Dataset> {
    if text.trim_start().starts_with('{') {
        Ok(serde_json::from_str(text)?)
    } else {
        parse_text(text)
    }
}

/// Build a flat dataset from numbers given on the command line.
pub fn dataset_from_values(values: &[f64]) -> Result<Dataset> {
    if values.is_empty() {
        bail!("no values given");
    }
    Ok(Dataset::flat(FLAT_GROUP, values.to_vec())?)
}

pub fn parse_text(text: &str) -> Result<Dataset> {
    let mut groups: Vec<Group> = Vec::new();
    let mut flat: Vec<f64> = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let lineno = lineno + 1;

        match line.split_once(':') {
            Some((head, values)) => {
                let (name, label) = match head.split_once('@') {
                    Some((name, label)) => (name.trim(), Some(label.trim())),
                    None => (head.trim(), None),
                };
                if name.is_empty() {
                    bail!("line {lineno}: missing group name");
                }
                let mut group = Group::new(name, parse_numbers(values, lineno)?);
                if let Some(label) = label.filter(|l| !l.is_empty()) {
                    group = group.with_label(label);
                }
                groups.push(group);
            }
            None => flat.extend(parse_numbers(line, lineno)?),
        }
    }

    if !groups.is_empty() && !flat.is_empty() {
        bail!("cannot mix named groups with bare readings");
    }
    if groups.is_empty() {
        if flat.is_empty() {
            bail!("no readings found");
        }
        return Ok(Dataset::flat(FLAT_GROUP, flat)?);
    }
    Ok(Dataset::from_groups(groups)?)
}

fn parse_numbers(s: &str, lineno: usize) -> Result<Vec<f64>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            tok.parse::<f64>()
                .with_context(|| format!("line {lineno}: invalid number '{tok}'"))
        })
        .collect()
}
