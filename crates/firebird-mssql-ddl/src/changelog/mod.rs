//! Versioned changelog document.
//!
//! Statements are grouped into version entries by logical unit (one entry
//! per table, per table's foreign keys, per index, per procedure, per
//! trigger, and one for all sequences). Entries keep the order in which
//! their first statement was emitted and are numbered from 1.
//!
//! The rendered document looks like:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <VRDDL maxversion="14" requires="FP">
//!   <version id="1" descr="Create table CUSTOMERS" usr_created="dba" dt_created="2024/05/01" usr_changed="" dt_changed=""><![CDATA[CREATE TABLE ...
//! ]]></version>
//! </VRDDL>
//! ```

use crate::emit::Statement;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Date format used in `dt_created`.
pub const DATE_FORMAT: &str = "%Y/%m/%d";

/// Document-level values that are not derived from the statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogMetadata {
    /// Written to every entry's `usr_created`.
    pub author: String,

    /// Written to every entry's `dt_created`.
    pub created: NaiveDate,

    /// Root `maxversion` attribute.
    pub max_version: u32,

    /// Root `requires` attribute.
    pub requires: String,
}

impl ChangelogMetadata {
    pub fn new(author: impl Into<String>, created: NaiveDate) -> Self {
        Self {
            author: author.into(),
            created,
            max_version: 14,
            requires: "FP".to_string(),
        }
    }

    pub fn with_max_version(mut self, max_version: u32) -> Self {
        self.max_version = max_version;
        self
    }

    pub fn with_requires(mut self, requires: impl Into<String>) -> Self {
        self.requires = requires.into();
        self
    }
}

/// One version entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub id: u32,
    pub description: String,
    pub statements: Vec<String>,
}

impl ChangelogEntry {
    /// SQL text stored in the entry.
    ///
    /// Statements are newline-terminated; one that does not end with `;`
    /// (a block ending in `GO`) gets an extra blank line after it.
    pub fn body(&self) -> String {
        let mut body = String::new();
        for statement in &self.statements {
            body.push_str(statement);
            body.push('\n');
            if !statement.trim_end().ends_with(';') {
                body.push('\n');
            }
        }
        body
    }
}

/// A complete changelog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    pub metadata: ChangelogMetadata,
    pub entries: Vec<ChangelogEntry>,
}

impl Changelog {
    /// Group statements into entries.
    pub fn from_statements(statements: &[Statement], metadata: ChangelogMetadata) -> Self {
        let mut entries: Vec<ChangelogEntry> = Vec::new();
        let mut by_description: HashMap<String, usize> = HashMap::new();

        for statement in statements {
            let sql = statement.sql.trim();
            if sql.is_empty() {
                continue;
            }
            let description = statement.description();
            let slot = match by_description.get(&description) {
                Some(&slot) => slot,
                None => {
                    let slot = entries.len();
                    by_description.insert(description.clone(), slot);
                    entries.push(ChangelogEntry {
                        id: slot as u32 + 1,
                        description,
                        statements: Vec::new(),
                    });
                    slot
                }
            };
            entries[slot].statements.push(sql.to_string());
        }

        Self { metadata, entries }
    }

    /// Render the XML document.
    pub fn render(&self) -> String {
        let created = self.metadata.created.format(DATE_FORMAT).to_string();
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        xml.push_str(&format!(
            "<VRDDL maxversion=\"{}\" requires=\"{}\">\n",
            self.metadata.max_version,
            escape_attribute(&self.metadata.requires)
        ));

        for entry in &self.entries {
            xml.push_str(&format!(
                "  <version id=\"{}\" descr=\"{}\" usr_created=\"{}\" dt_created=\"{}\" \
                 usr_changed=\"\" dt_changed=\"\">",
                entry.id,
                escape_attribute(&entry.description),
                escape_attribute(&self.metadata.author),
                created
            ));
            xml.push_str(&cdata(&entry.body()));
            xml.push_str("</version>\n");
        }

        xml.push_str("</VRDDL>\n");
        xml
    }

    /// Render and write the document to `path`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.render())?;
        info!(
            "Wrote changelog with {} entries to {:?}",
            self.entries.len(),
            path.as_ref()
        );
        Ok(())
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap text in a CDATA section. `]]>` cannot appear inside one, so it is
/// split across two sections.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
