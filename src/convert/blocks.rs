//! Rewrites inside existing `DO $$ ... $$` blocks.

use super::rules::{map_unquoted, Protect};
use super::ConversionLog;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static BLOCK_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDO\s*\$\$").unwrap());
static DO_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bDO\s*\$\$\s*(.*?)\s*\$\$\s*;?").unwrap());
static SIGIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").unwrap());
static DECLARE_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDECLARE\s+(\w+)\s+(\w+)\s*=\s*([^;]*);").unwrap());
static IF_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bIF\s+(\w+)\s*=\s*1\s+BEGIN\b").unwrap());
static IF_BEGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bIF\s+([^;]+?)\s+BEGIN\b").unwrap());
static THEN_BEGIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bTHEN\s+BEGIN\b").unwrap());
static OPENS_IF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bIF\b.*\bTHEN\b").unwrap());
static ENDS_WITH_THEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bTHEN$").unwrap());

pub(super) fn has_anonymous_block(sql: &str) -> bool {
    BLOCK_START.is_match(sql)
}

/// Rewrite the T-SQL control flow found inside every `DO $$` block.
pub(super) fn normalize_blocks(sql: &str, log: &mut ConversionLog) -> String {
    let mut blocks = 0;
    let text = DO_BLOCK.replace_all(sql, |caps: &Captures| {
        let rendered = format!("DO $$\n{}\n$$;", normalize_block(&caps[1]));
        if rendered != caps[0] {
            blocks += 1;
        }
        rendered
    });

    if blocks > 0 {
        log.push(format!(
            "[OK] DO $$ blocks converted (T-SQL -> PL/pgSQL) ({})",
            blocks
        ));
    }
    text.into_owned()
}

fn normalize_block(content: &str) -> String {
    let content = map_unquoted(content, Protect::Strings, |plain| {
        SIGIL.replace_all(plain, "$1").into_owned()
    });

    let content = DECLARE_ASSIGN.replace_all(&content, |caps: &Captures| {
        let name = caps[1].to_lowercase();
        let data_type = caps[2].to_lowercase();
        let raw = caps[3].trim();
        let value = match (data_type.as_str(), raw) {
            ("boolean" | "bool", "1") => "true",
            ("boolean" | "bool", "0") => "false",
            _ => raw,
        };
        format!("DECLARE {} {} := {};", name, data_type, value)
    });

    let content = IF_FLAG.replace_all(&content, "IF ${1} THEN");

    let content = IF_BEGIN.replace_all(&content, |caps: &Captures| {
        let condition = caps[1].trim();
        if ENDS_WITH_THEN.is_match(condition) {
            format!("IF {}", condition)
        } else {
            format!("IF {} THEN", condition)
        }
    });

    let mut tracker = IfDepthTracker::new();
    let content = content
        .lines()
        .map(|line| tracker.feed(line))
        .collect::<Vec<_>>()
        .join("\n");

    THEN_BEGIN.replace_all(&content, "THEN").into_owned()
}

/// Pairs bare `END` lines with the `IF ... THEN` lines they close.
///
/// Line-oriented and shallow: a line counts as opening an IF only when the
/// `IF` and its `THEN` are on the same line, and only a line consisting of
/// `END` or `END;` closes one.
#[derive(Debug, Default)]
pub struct IfDepthTracker {
    depth: usize,
}

impl IfDepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_inside_if(&self) -> bool {
        self.depth > 0
    }

    /// Feed one line and get it back, with a closing `END` turned into `END IF;`.
    pub fn feed<'a>(&mut self, line: &'a str) -> Cow<'a, str> {
        let trimmed = line.trim();
        let upper = trimmed.to_uppercase();

        if upper == "END IF" || upper == "END IF;" {
            self.depth = self.depth.saturating_sub(1);
            return Cow::Borrowed(line);
        }

        if self.depth > 0 && (upper == "END" || upper == "END;") {
            self.depth -= 1;
            let indent = &line[..line.len() - line.trim_start().len()];
            return Cow::Owned(format!("{}END IF;", indent));
        }

        if OPENS_IF.is_match(trimmed) && !upper.contains("END IF") {
            self.depth += 1;
        }
        Cow::Borrowed(line)
    }
}
