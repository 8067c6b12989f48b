//! Stack files - the sectioned, versioned text format for stack definitions
//!
//! ```text
//! *VERSIONINFO, 0.8.1, 4.0
//! *OPTIONS,False,False,True,True,True,mm,
//! *ANALYSISINFO
//! 0,Title
//! 1,Document number
//! 2,Revision
//! 3,Description with \n escaped
//! *CONSTANTS, VALUE, NOTE
//! *DIMENSIONS, NOMINAL, PLUS, MINUS, DISTRIBUTION, PART NUMBER, NOTE
//! *EXPRESSIONS, VALUE, LOWER, UPPER, METHOD, NOTE
//! ```

use miette::{Diagnostic, NamedSource, SourceSpan};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::sync::LazyLock;
use thiserror::Error;

use crate::stack::rows::{Row, Rows, Section};

/// Application version written to new files
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current file format version
pub const FILE_FORMAT: &str = "4.0";

/// Older formats that differ only in the options line
const OPTIONLESS_FORMATS: [&str; 2] = ["2.0", "3.0"];

const OPTION_COUNT: usize = 7;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*VERSIONINFO,\s*(\S+),\s*(\S+)").unwrap_or_else(|e| panic!("invalid version pattern: {e}"))
});

/// Stack file syntax or version error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(tolstack::file::syntax))]
pub struct StackFileError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl StackFileError {
    /// Error pointing at a whole line (0-based)
    fn at_line(message: impl Into<String>, source: &str, filename: &str, line: usize, help: Option<String>) -> Self {
        let (offset, len) = line_span(source, line);
        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset + len.max(1)),
            help,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Byte offset and length of a line, excluding its terminator
fn line_span(source: &str, line: usize) -> (usize, usize) {
    let mut offset = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i == line {
            return (offset, text.trim_end_matches(['\r', '\n']).len());
        }
        offset += text.len();
    }
    (source.len().saturating_sub(1), 0)
}

/// Report options stored with a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOptions {
    pub find_images: bool,
    pub show_plots: bool,
    pub where_used: bool,
    pub sensitivity: bool,
    pub contributions: bool,
    pub units: String,
    pub image_folder: String,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            find_images: false,
            show_plots: false,
            where_used: false,
            sensitivity: false,
            contributions: false,
            units: "mm".to_string(),
            image_folder: String::new(),
        }
    }
}

/// Title block printed at the top of a report
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisInfo {
    pub title: String,
    pub doc_number: String,
    pub revision: String,
    pub description: String,
}

/// A stack definition as stored on disk
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackFile {
    /// Version of the application that wrote the file
    pub app_version: String,
    /// Format version the file was read as
    pub format_version: String,
    pub options: StackOptions,
    pub info: AnalysisInfo,
    pub rows: Rows,
}

/// Parse a boolean written by any common convention
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn version_parts(version: &str) -> Option<Vec<u32>> {
    version.split('.').map(|p| p.parse().ok()).collect()
}

/// Compare dotted versions, treating missing components as zero
fn compare_versions(a: &[u32], b: &[u32]) -> Ordering {
    (0..a.len().max(b.len()))
        .map(|i| a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Which block of the file the parser is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Info,
    Rows(Section),
}

impl StackFile {
    /// An empty stack file at the current versions
    pub fn new() -> Self {
        Self {
            app_version: APP_VERSION.to_string(),
            format_version: FILE_FORMAT.to_string(),
            ..Default::default()
        }
    }

    /// Parse stack file text; `filename` is used for diagnostics only
    pub fn parse(source: &str, filename: &str) -> Result<Self, StackFileError> {
        let err = |message: String, line: usize, help: Option<&str>| {
            StackFileError::at_line(message, source, filename, line, help.map(str::to_string))
        };

        let mut lines = source.lines().enumerate();
        let first = lines.next().map(|(_, l)| l.trim()).unwrap_or("");
        let caps = VERSION_RE.captures(first).ok_or_else(|| {
            err(
                "missing version information".to_string(),
                0,
                Some("the first line must be '*VERSIONINFO, <app version>, <format version>'"),
            )
        })?;

        let mut file = StackFile {
            app_version: caps[1].to_string(),
            format_version: caps[2].to_string(),
            ..Default::default()
        };

        let found = version_parts(&file.format_version)
            .ok_or_else(|| err(format!("invalid file format version '{}'", file.format_version), 0, None))?;
        let current = version_parts(FILE_FORMAT).unwrap_or_default();
        let default_options = match compare_versions(&found, &current) {
            Ordering::Greater => {
                return Err(err(
                    format!("file format {} is newer than supported format {}", file.format_version, FILE_FORMAT),
                    0,
                    Some("upgrade tolstack to read this file"),
                ));
            }
            Ordering::Less => {
                let optionless = OPTIONLESS_FORMATS
                    .iter()
                    .filter_map(|v| version_parts(v))
                    .any(|v| compare_versions(&found, &v).is_eq());
                if !optionless {
                    return Err(err(
                        format!("file format {} is too old to read", file.format_version),
                        0,
                        Some("edit the file or copy its entries into a new one"),
                    ));
                }
                true
            }
            Ordering::Equal => false,
        };

        let mut block = Block::None;
        for (n, raw) in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("*OPTIONS") {
                block = Block::None;
                if default_options {
                    log::debug!("format {} ignores options line", file.format_version);
                    continue;
                }
                let rest = rest.strip_prefix(',').unwrap_or(rest);
                file.options = parse_options(rest).map_err(|message| {
                    err(
                        message,
                        n,
                        Some("expected find images, show plots, where used, sensitivity, contributions, units, image folder"),
                    )
                })?;
                continue;
            }

            if line.starts_with('*') {
                block = if line.starts_with("*ANALYSISINFO") {
                    Block::Info
                } else if line.starts_with("*CONSTANTS") {
                    Block::Rows(Section::Constants)
                } else if line.starts_with("*DIMENSIONS") {
                    Block::Rows(Section::Dimensions)
                } else if line.starts_with("*EXPRESSIONS") {
                    Block::Rows(Section::Expressions)
                } else {
                    log::debug!("ignoring section '{}'", line);
                    Block::None
                };
                continue;
            }

            match block {
                Block::Info => {
                    let (key, text) = line.split_once(',').unwrap_or((line, ""));
                    let text = text.replace("\\n", "\n");
                    match key.trim() {
                        "0" => file.info.title = text,
                        "1" => file.info.doc_number = text,
                        "2" => file.info.revision = text,
                        "3" => file.info.description = text,
                        other => {
                            return Err(err(
                                format!("unknown analysis info key '{}'", other),
                                n,
                                Some("keys are 0 (title), 1 (document number), 2 (revision), 3 (description)"),
                            ))
                        }
                    }
                }
                Block::Rows(section) => {
                    file.rows
                        .section_mut(section)
                        .push(Row::split(line, section.field_limit()));
                }
                Block::None => log::warn!("{}:{}: line outside any section ignored", filename, n + 1),
            }
        }

        log::info!(
            "read {} rows from {} (format {})",
            file.rows.len(),
            filename,
            file.format_version
        );
        Ok(file)
    }
}

fn parse_options(text: &str) -> Result<StackOptions, String> {
    let fields: Vec<&str> = text.splitn(OPTION_COUNT, ',').collect();
    if fields.len() < OPTION_COUNT {
        return Err(format!(
            "options line has {} fields, expected {}",
            fields.len(),
            OPTION_COUNT
        ));
    }

    let flag = |i: usize| {
        parse_bool(fields[i]).ok_or_else(|| format!("option '{}' is not a boolean", fields[i].trim()))
    };

    Ok(StackOptions {
        find_images: flag(0)?,
        show_plots: flag(1)?,
        where_used: flag(2)?,
        sensitivity: flag(3)?,
        contributions: flag(4)?,
        units: fields[5].to_string(),
        image_folder: fields[6].to_string(),
    })
}

/// Files are always written at the current application and format versions
impl std::fmt::Display for StackFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        writeln!(out, "*VERSIONINFO, {}, {}", APP_VERSION, FILE_FORMAT)?;

        let o = &self.options;
        writeln!(
            out,
            "*OPTIONS,{},{},{},{},{},{},{}",
            format_bool(o.find_images),
            format_bool(o.show_plots),
            format_bool(o.where_used),
            format_bool(o.sensitivity),
            format_bool(o.contributions),
            o.units,
            o.image_folder
        )?;

        writeln!(out, "*ANALYSISINFO")?;
        for (key, text) in [
            &self.info.title,
            &self.info.doc_number,
            &self.info.revision,
            &self.info.description,
        ]
        .iter()
        .enumerate()
        {
            writeln!(out, "{},{}", key, text.replace('\n', "\\n"))?;
        }

        for (section, header) in [
            (Section::Constants, "*CONSTANTS, VALUE, NOTE"),
            (
                Section::Dimensions,
                "*DIMENSIONS, NOMINAL, PLUS, MINUS, DISTRIBUTION, PART NUMBER, NOTE",
            ),
            (Section::Expressions, "*EXPRESSIONS, VALUE, LOWER, UPPER, METHOD, NOTE"),
        ] {
            writeln!(out, "{}", header)?;
            for row in self.rows.section(section) {
                writeln!(out, "{}", row.join())?;
            }
        }

        f.write_str(&out)
    }
}
