use anyhow::{bail, Context, Result};
use glob::glob;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// `<entityCode><year><category>_cleaned.csv`; the entity code is matched
// non-greedily so the trailing four digits are the year.
static FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)(\d{4})([a-z])_cleaned\.csv$").unwrap());

/// One yearly input file, parsed from its filename. Ephemeral: rebuilt on
/// every run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub entity_code: String,
    pub year: i32,
    pub category: char,
}

/// Parse a path's filename into a [`SourceFile`]; `None` if it doesn't
/// match the expected pattern.
pub fn parse_filename(path: &Path) -> Option<SourceFile> {
    let name = path.file_name()?.to_str()?;
    let caps = FILENAME.captures(name)?;
    let year = caps.get(2)?.as_str().parse().ok()?;
    let category = caps.get(3)?.as_str().chars().next()?;
    Some(SourceFile {
        path: path.to_path_buf(),
        entity_code: caps.get(1)?.as_str().to_string(),
        year,
        category,
    })
}

/// The files sharing (entity code, category), ascending by year.
#[derive(Debug)]
pub struct SourceGroup {
    pub entity_code: String,
    pub category: char,
    pub files: Vec<SourceFile>,
}

impl SourceGroup {
    pub fn output_name(&self) -> String {
        format!("{}_{}_merged.csv", self.entity_code, self.category)
    }

    /// First and last year covered by this group; `None` for an empty group.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        Some((self.files.first()?.year, self.files.last()?.year))
    }

    /// Two files for the same year almost always mean a duplicated export;
    /// fail the group rather than silently pick a winner.
    pub fn ensure_distinct_years(&self) -> Result<()> {
        for pair in self.files.windows(2) {
            if pair[0].year == pair[1].year {
                bail!(
                    "group {}/{} has two files for year {}: {} and {}",
                    self.entity_code,
                    self.category,
                    pair[0].year,
                    pair[0].path.display(),
                    pair[1].path.display()
                );
            }
        }
        Ok(())
    }
}

/// Find every `*_cleaned.csv` under `dir` and group by (entity code,
/// category). Non-matching filenames are skipped; groups come back in
/// sorted key order so runs are reproducible.
pub fn scan_directory(dir: &Path) -> Result<Vec<SourceGroup>> {
    let pattern = dir.join("*_cleaned.csv");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("non-UTF-8 data directory path {:?}", dir))?;

    let mut keyed: BTreeMap<(String, char), Vec<SourceFile>> = BTreeMap::new();
    for entry in glob(pattern).with_context(|| format!("bad glob pattern '{}'", pattern))? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!("skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        match parse_filename(&path) {
            Some(file) => keyed
                .entry((file.entity_code.clone(), file.category))
                .or_default()
                .push(file),
            None => debug!("skipping non-matching file {}", path.display()),
        }
    }

    let groups = keyed
        .into_iter()
        .map(|((entity_code, category), mut files)| {
            files.sort_by_key(|f| f.year);
            SourceGroup {
                entity_code,
                category,
                files,
            }
        })
        .collect();
    Ok(groups)
}
