//! Line and regex rewrite rules that do not need block structure.

use super::{ConversionLog, Converter};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static GO_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^\s*go\s*$").unwrap());
static BINARY_MAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:varbinary|bytea)\s*\(\s*max\s*\)").unwrap());
static VARCHAR_MAX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bn?varchar\s*\(\s*max\s*\)").unwrap());
static BRACKET_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());
static SIGIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").unwrap());

static CREATE_PROCEDURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bCREATE\s+(OR\s+ALTER\s+)?PROC(?:EDURE)?\b").unwrap());
static FUNCTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(\bCREATE\s+(?:OR\s+REPLACE\s+)?FUNCTION\s+[\w."]+\s*(?:\([^)]*\))?\s*RETURNS\s+[\w.()]+)\s+AS\s+"#,
    )
    .unwrap()
});
static BODY_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$[ \t]*;").unwrap());
static SEPARATOR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*;[ \t]*$").unwrap());

static BEGIN_TRAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBEGIN\s+TRAN(?:SACTION)?\b").unwrap());
static COMMIT_TRAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bCOMMIT\s+TRAN(?:SACTION)?\b").unwrap());
static ROLLBACK_TRAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bROLLBACK\s+TRAN(?:SACTION)?\b").unwrap());

static EXTENDED_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bif\s+exists\s*\(\s*select\s+.*?from\s+sys\.extended_properties.*?\)\s*begin\s+exec\s+sys\.sp_(?:add|update)extendedproperty.*?end\s*else\s*begin\s+exec\s+sys\.sp_(?:add|update)extendedproperty.*?end",
    )
    .unwrap()
});
static PARENT_OBJECT_GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\band\s+parent_object_id\s*=\s*object_id\s*\([^)]*\)").unwrap()
});
static OBJECT_ID_GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*if\s+object_id\s*\([^)]*\)\s+is\s+not\s+null\s+").unwrap()
});
static FOREIGN_KEY_CHECK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bif\s+exists\s*\(\s*select\s+\*\s+from\s+sys\.foreign_keys\s+where\s+object_id.*?\)\s*\n",
    )
    .unwrap()
});

static DROP_INDEX_ON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bdrop\s+index\s+(?:if\s+exists\s+)?("[^"]+"|\w+)\s+on\s+(?:(?:"[^"]+"|\w+)\.)?(?:"[^"]+"|\w+)"#,
    )
    .unwrap()
});
static ALTER_DROP_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\balter\s+table\s+((?:(?:"[^"]+"|\w+)\.)?(?:"[^"]+"|\w+))\s+drop\s+constraint\s+("[^"]+"|\w+)\s*;"#,
    )
    .unwrap()
});
static BARE_DROP_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(\s*)drop\s+constraint\s+(?:if\s+exists\s+)?("[^"]+"|\w+)\s*;?\s*$"#).unwrap()
});
static DROP_TABLE_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bDROP\s+TABLE\s+("[^"]+"|\w+)\s*;"#).unwrap());
static DROP_INDEX_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bDROP\s+INDEX\s+("[^"]+"|\w+)\s*;"#).unwrap());

static GETDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:getdate|sysdatetime)\s*\(\s*\)").unwrap());
static NEWID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bnewid\s*\(\s*\)").unwrap());
static DEFAULT_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdefault\s+current_timestamp\b").unwrap());

static KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:primary\s+key|foreign\s+key|not\s+null|drop\s+table|drop\s+index|drop\s+constraint|alter\s+table|create\s+table|if\s+exists|end\s+if|generated\s+(?:always|by\s+default)\s+as\s+identity|with\s+time\s+zone|double\s+precision|unique|default|check|cascade|then|varchar|char|text|bytea|integer|smallint|bigint|decimal|numeric|float|double|precision|boolean|timestamp|date|time)\b",
    )
    .unwrap()
});
static QUOTED_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i:(create\s+table\s+))"([a-z_][a-z0-9_]*)"(\s*\()"#).unwrap());
static TABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:(create\s+table\s+))([A-Za-z_][A-Za-z0-9_]*)(\s*\()").unwrap()
});
const COLUMN_TYPES: &str = "varchar|char|text|bytea|integer|smallint|bigint|decimal|numeric|float|double|boolean|timestamptz|timestamp|time|date|uuid|xml|real";
static QUOTED_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?m)^([ \t]+)"([a-z_][a-z0-9_]*)"([ \t]+(?i:{}))\b"#,
        COLUMN_TYPES
    ))
    .unwrap()
});
static COLUMN_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]+((?i:{}))\b",
        COLUMN_TYPES
    ))
    .unwrap()
});

static DO_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bDO\s*\$\$").unwrap());
static REPEATED_SEMICOLONS: Lazy<Regex> = Lazy::new(|| Regex::new(r";\s*;\s*").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n+").unwrap());

/// PostgreSQL reserved words; identifiers spelled like these keep their quotes.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric", "both", "case",
    "cast", "check", "collate", "column", "constraint", "create", "current_catalog",
    "current_date", "current_role", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false", "fetch",
    "for", "foreign", "from", "grant", "group", "having", "in", "initially", "intersect", "into",
    "lateral", "leading", "limit", "localtime", "localtimestamp", "not", "null", "offset", "on",
    "only", "or", "order", "placing", "primary", "references", "returning", "select",
    "session_user", "some", "symmetric", "table", "then", "to", "trailing", "true", "union",
    "unique", "user", "using", "variadic", "when", "where", "window", "with",
];

/// Which quoted spans [`map_unquoted`] leaves alone. Comments are always skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Protect {
    Strings,
    StringsAndIdentifiers,
}

/// Apply `f` to every stretch of `text` outside string literals, comments and
/// (optionally) delimited identifiers.
pub(super) fn map_unquoted<F>(text: &str, protect: Protect, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let bytes = text.as_bytes();
    let identifiers = protect == Protect::StringsAndIdentifiers;
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\'' => Some(closing(bytes, i + 1, b'\'')),
            b'"' if identifiers => Some(closing(bytes, i + 1, b'"')),
            b'[' if identifiers => Some(closing(bytes, i + 1, b']')),
            b'-' if bytes.get(i + 1) == Some(&b'-') => Some(line_end(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => Some(comment_end(bytes, i + 2)),
            _ => None,
        };
        match end {
            Some(end) => {
                out.push_str(&f(&text[plain_start..i]));
                out.push_str(&text[i..end]);
                i = end;
                plain_start = end;
            }
            None => i += 1,
        }
    }

    out.push_str(&f(&text[plain_start..]));
    out
}

fn closing(bytes: &[u8], mut j: usize, close: u8) -> usize {
    while j < bytes.len() {
        if bytes[j] == close {
            // doubled delimiter is an escaped delimiter
            if bytes.get(j + 1) == Some(&close) {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn comment_end(bytes: &[u8], start: usize) -> usize {
    if start >= bytes.len() {
        return bytes.len();
    }
    bytes[start..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| start + p + 2)
}

/// Replace every match with `f(caps)`; returns the text and the number of matches that changed.
pub(super) fn rewrite<F>(re: &Regex, text: &str, mut f: F) -> (String, usize)
where
    F: FnMut(&Captures) -> String,
{
    let mut changed = 0;
    let out = re.replace_all(text, |caps: &Captures| {
        let replacement = f(caps);
        if replacement != caps[0] {
            changed += 1;
        }
        replacement
    });
    (out.into_owned(), changed)
}

fn rewrite_unquoted<F>(re: &Regex, text: &str, protect: Protect, mut f: F) -> (String, usize)
where
    F: FnMut(&Captures) -> String,
{
    let mut total = 0;
    let out = map_unquoted(text, protect, |segment| {
        let (rewritten, n) = rewrite(re, segment, &mut f);
        total += n;
        rewritten
    });
    (out, total)
}

/// Lowercase an identifier unless any part of it is delimited.
pub(super) fn fold_identifier(name: &str) -> String {
    if name.contains('"') {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

pub(super) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

pub(super) fn batch_separators(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&GO_SEPARATOR, sql, |_| ";".to_string());
    if n > 0 {
        log.push(format!("GO -> ; ({} occurrences)", n));
    }
    text
}

pub(super) fn data_types(cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
    let (mut text, n) =
        rewrite_unquoted(&BINARY_MAX, sql, Protect::StringsAndIdentifiers, |_| {
            "BYTEA".to_string()
        });
    if n > 0 {
        log.push(format!("VARBINARY(MAX) -> BYTEA ({} occurrences)", n));
    }

    let (next, n) = rewrite_unquoted(&VARCHAR_MAX, &text, Protect::StringsAndIdentifiers, |_| {
        "TEXT".to_string()
    });
    text = next;
    if n > 0 {
        log.push(format!("VARCHAR(MAX) -> TEXT ({} occurrences)", n));
    }

    for rule in &cx.type_rules {
        let target = rule.target.as_str();
        let (next, n) = rewrite_unquoted(
            &rule.pattern,
            &text,
            Protect::StringsAndIdentifiers,
            |caps| {
                if caps[0].eq_ignore_ascii_case(target) {
                    caps[0].to_string()
                } else {
                    target.to_string()
                }
            },
        );
        text = next;
        if n > 0 {
            log.push(format!("{} -> {} ({} occurrences)", rule.source, target, n));
        }
    }

    text
}

pub(super) fn collations(cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
    let mut text = sql.to_string();

    for rule in &cx.collation_rules {
        let (next, n) = rewrite(&rule.pattern, &text, |caps| match &rule.target {
            Some(target) => format!(r#"{}COLLATE "{}""#, &caps[1], target),
            None => String::new(),
        });
        text = next;
        if n == 0 {
            continue;
        }
        match &rule.target {
            Some(target) => log.push(format!(
                "COLLATE {} -> \"{}\" ({} occurrences)",
                rule.source, target, n
            )),
            None => log.push(format!(
                "COLLATE {} dropped, database default applies ({} occurrences)",
                rule.source, n
            )),
        }
    }

    text
}

pub(super) fn schema_prefix(cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&cx.schema_prefix, sql, |_| String::new());
    if n > 0 {
        log.push(format!(
            "{}. prefixes removed ({} occurrences)",
            cx.options.default_schema, n
        ));
    }
    text
}

pub(super) fn bracket_identifiers(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite_unquoted(&BRACKET_IDENTIFIER, sql, Protect::Strings, |caps| {
        format!("\"{}\"", &caps[1])
    });
    if n > 0 {
        log.push(format!("[identifier] -> \"identifier\" ({} occurrences)", n));
    }
    text
}

pub(super) fn procedures(sql: &str, log: &mut ConversionLog) -> String {
    let (mut text, n) = rewrite(&CREATE_PROCEDURE, sql, |caps| {
        if caps.get(1).is_some() {
            "CREATE OR REPLACE FUNCTION".to_string()
        } else {
            "CREATE FUNCTION".to_string()
        }
    });
    if n == 0 {
        return text;
    }
    log.push(format!("CREATE PROCEDURE -> CREATE FUNCTION ({} occurrences)", n));

    text = map_unquoted(&text, Protect::Strings, |plain| {
        SIGIL.replace_all(plain, "$1").into_owned()
    });

    let header = FUNCTION_HEADER
        .captures(&text)
        .and_then(|caps| Some((caps.get(0)?.end(), caps.get(1)?.end())));
    let Some((end, signature_end)) = header else {
        return text;
    };
    if text[end..].starts_with("$$") {
        return text;
    }

    let mut body = String::with_capacity(text.len() + 32);
    body.push_str(&text[..signature_end]);
    body.push_str(" AS $$\n");
    let rest = &text[end..];

    let close = [BODY_CLOSE.find(rest), SEPARATOR_LINE.find(rest)]
        .into_iter()
        .flatten()
        .min_by_key(|m| m.start());
    match close {
        Some(m) => {
            body.push_str(&rest[..m.start()]);
            body.push_str("$$ LANGUAGE plpgsql;");
            body.push_str(&rest[m.end()..]);
        }
        None => {
            body.push_str(rest.trim_end());
            body.push_str("\n$$ LANGUAGE plpgsql;");
        }
    }
    log.push("Function body delimited with $$ ... $$ LANGUAGE plpgsql");

    body
}

pub(super) fn transactions(sql: &str, log: &mut ConversionLog) -> String {
    let (text, begins) = rewrite(&BEGIN_TRAN, sql, |_| "BEGIN".to_string());
    let (text, commits) = rewrite(&COMMIT_TRAN, &text, |_| "COMMIT".to_string());
    let (text, rollbacks) = rewrite(&ROLLBACK_TRAN, &text, |_| "ROLLBACK".to_string());
    let n = begins + commits + rollbacks;
    if n > 0 {
        log.push(format!("Transaction statements converted ({} occurrences)", n));
    }
    text
}

pub(super) fn extended_properties(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&EXTENDED_PROPERTY, sql, |_| String::new());
    if n > 0 {
        log.push(format!(
            "Extended property blocks removed ({}) - review manually!",
            n
        ));
    }
    text
}

pub(super) fn parent_object_guards(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&PARENT_OBJECT_GUARD, sql, |_| String::new());
    if n > 0 {
        log.push(format!("parent_object_id checks removed ({})", n));
    }
    text
}

/// `IF OBJECT_ID(...) IS NOT NULL` directly guarding a DROP is dropped; the DROP
/// gets its own `IF EXISTS` later.
pub(super) fn object_id_guards(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&OBJECT_ID_GUARD, sql, |caps| {
        let end = caps.get(0).map_or(sql.len(), |m| m.end());
        if starts_with_ignore_case(&sql[end..], "drop") {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    if n > 0 {
        log.push(format!("OBJECT_ID() checks simplified ({} occurrences)", n));
    }
    text
}

pub(super) fn foreign_key_checks(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&FOREIGN_KEY_CHECK, sql, |_| String::new());
    if n > 0 {
        log.push(format!("Redundant sys.foreign_keys IF EXISTS removed ({})", n));
    }
    text
}

pub(super) fn drop_index(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&DROP_INDEX_ON, sql, |caps| {
        format!("drop index if exists {}", fold_identifier(&caps[1]))
    });
    if n > 0 {
        log.push(format!("DROP INDEX ... ON table -> DROP INDEX ({})", n));
    }
    text
}

pub(super) fn drop_constraint(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&ALTER_DROP_CONSTRAINT, sql, |caps| {
        format!(
            "alter table {} drop constraint if exists {};",
            fold_identifier(&caps[1]),
            fold_identifier(&caps[2])
        )
    });
    if n > 0 {
        log.push(format!("ALTER TABLE DROP CONSTRAINT converted ({})", n));
    }

    let mut placeholders = 0;
    let mut previous: Option<String> = None;
    let mut lines = Vec::new();
    for line in text.lines() {
        let rewritten = match BARE_DROP_CONSTRAINT.captures(line) {
            Some(caps) if !continues_statement(previous.as_deref()) => {
                placeholders += 1;
                format!(
                    "{}alter table table_name drop constraint if exists {};",
                    &caps[1],
                    fold_identifier(&caps[2])
                )
            }
            _ => line.to_string(),
        };
        if !rewritten.trim().is_empty() {
            previous = Some(rewritten.clone());
        }
        lines.push(rewritten);
    }
    if placeholders == 0 {
        return text;
    }

    log.push(format!(
        "DROP CONSTRAINT without table rewritten against placeholder table_name ({}) - review manually!",
        placeholders
    ));
    let mut result = lines.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Whether a line following `previous` is still part of that statement.
fn continues_statement(previous: Option<&str>) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    let trimmed = previous.trim();
    if trimmed.starts_with("--") || trimmed.ends_with(';') || trimmed.ends_with("$$") {
        return false;
    }
    let upper = trimmed.to_uppercase();
    !(upper.ends_with("BEGIN") || upper.ends_with("THEN") || upper.ends_with("ELSE"))
}

pub(super) fn drop_statements(sql: &str, log: &mut ConversionLog) -> String {
    let (text, tables) = rewrite(&DROP_TABLE_PLAIN, sql, |caps| {
        format!("DROP TABLE IF EXISTS {} CASCADE;", fold_identifier(&caps[1]))
    });
    if tables > 0 {
        log.push(format!(
            "DROP TABLE statements improved ({} occurrences)",
            tables
        ));
    }

    let (text, indexes) = rewrite(&DROP_INDEX_PLAIN, &text, |caps| {
        format!("DROP INDEX IF EXISTS {};", fold_identifier(&caps[1]))
    });
    if indexes > 0 {
        log.push(format!(
            "DROP INDEX statements improved ({} occurrences)",
            indexes
        ));
    }
    text
}

pub(super) fn timestamp_defaults(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite(&GETDATE, sql, |_| "CURRENT_TIMESTAMP".to_string());
    if n > 0 {
        log.push(format!("GETDATE() -> CURRENT_TIMESTAMP ({} occurrences)", n));
    }

    let (text, n) = rewrite(&NEWID, &text, |_| "gen_random_uuid()".to_string());
    if n > 0 {
        log.push(format!("NEWID() -> gen_random_uuid() ({} occurrences)", n));
    }

    let (text, n) = rewrite(&DEFAULT_TIMESTAMP, &text, |_| {
        "default current_timestamp".to_string()
    });
    if n > 0 {
        log.push(format!(
            "DEFAULT CURRENT_TIMESTAMP adjusted ({} occurrences)",
            n
        ));
    }
    text
}

pub(super) fn lowercase(sql: &str, log: &mut ConversionLog) -> String {
    let (text, keywords) = rewrite_unquoted(&KEYWORDS, sql, Protect::StringsAndIdentifiers, |caps| {
        caps[0].to_lowercase()
    });

    let (text, quoted_tables) = rewrite(&QUOTED_TABLE_NAME, &text, |caps| {
        if is_reserved(&caps[2]) {
            caps[0].to_string()
        } else {
            format!("{}{}{}", &caps[1], &caps[2], &caps[3])
        }
    });
    let (text, tables) = rewrite(&TABLE_NAME, &text, |caps| {
        format!("{}{}{}", &caps[1], caps[2].to_lowercase(), &caps[3])
    });
    let (text, quoted_columns) = rewrite(&QUOTED_COLUMN, &text, |caps| {
        if is_reserved(&caps[2]) {
            caps[0].to_string()
        } else {
            format!("{}{}{}", &caps[1], &caps[2], &caps[3])
        }
    });
    let (text, columns) = rewrite(&COLUMN_LINE, &text, |caps| {
        format!("    {} {}", caps[1].to_lowercase(), caps[2].to_lowercase())
    });

    let n = keywords + quoted_tables + tables + quoted_columns + columns;
    if n > 0 {
        log.push(format!("Keywords and identifiers lowercased ({} changes)", n));
    }
    text
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropGroup {
    Indexes,
    Constraints,
    Tables,
}

impl DropGroup {
    fn classify(line: &str) -> Option<Self> {
        let lowered = line.trim().to_lowercase();
        if lowered.starts_with("drop index") {
            Some(DropGroup::Indexes)
        } else if lowered.starts_with("alter table") && lowered.contains("drop constraint") {
            Some(DropGroup::Constraints)
        } else if lowered.starts_with("drop table") {
            Some(DropGroup::Tables)
        } else {
            None
        }
    }

    fn header(self) -> &'static str {
        match self {
            DropGroup::Indexes => "-- Drop indexes",
            DropGroup::Constraints => "-- Drop constraints",
            DropGroup::Tables => "-- Drop tables",
        }
    }

    fn finish(self, statement: &str) -> String {
        if self == DropGroup::Tables
            && statement.ends_with(';')
            && !statement.to_lowercase().contains("cascade")
        {
            format!("{} cascade;", statement.trim_end_matches(';').trim_end())
        } else {
            statement.to_string()
        }
    }
}

/// Group adjacent DROP statements inside `DO $$` blocks under comment headers.
pub(super) fn format_blocks(sql: &str, log: &mut ConversionLog) -> String {
    let lines: Vec<&str> = sql.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_block = false;
    let mut groups = 0;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if !in_block {
            if DO_OPEN.is_match(line) && !trimmed.ends_with("$$;") {
                in_block = true;
            }
            out.push(line.to_string());
            i += 1;
            continue;
        }

        if trimmed.ends_with("$$;") {
            in_block = false;
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let Some(group) = DropGroup::classify(trimmed) else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        let mut members = Vec::new();
        while i < lines.len() && DropGroup::classify(lines[i]) == Some(group) {
            members.push(lines[i].trim());
            i += 1;
        }

        let has_header = out
            .last()
            .is_some_and(|previous| previous.trim() == group.header());
        if !has_header {
            out.push(format!("    {}", group.header()));
            groups += 1;
        }
        out.extend(members.into_iter().map(|m| format!("    {}", group.finish(m))));
    }

    if groups > 0 {
        log.push(format!("SQL formatted ({} DROP groups)", groups));
    }

    let mut result = out.join("\n");
    if sql.ends_with('\n') {
        result.push('\n');
    }
    result
}

pub(super) fn cleanup(sql: &str, log: &mut ConversionLog) -> String {
    let (text, n) = rewrite_unquoted(&REPEATED_SEMICOLONS, sql, Protect::Strings, |_| {
        ";\n".to_string()
    });
    if n > 0 {
        log.push(format!("Repeated semicolons collapsed ({} occurrences)", n));
    }

    // a lone `;` terminates whatever statement came before it
    let mut kept: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.trim() != ";" {
            kept.push(line.to_string());
            continue;
        }
        let previous = kept.iter_mut().rev().find(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with("--")
        });
        if let Some(previous) = previous {
            if !previous.trim_end().ends_with(';') {
                let len = previous.trim_end().len();
                previous.truncate(len);
                previous.push(';');
            }
        }
    }

    let joined = kept.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn converter() -> Converter {
        Converter::with_defaults().unwrap()
    }

    #[test]
    fn test_map_unquoted_skips_strings_comments_and_identifiers() {
        let text = "int 'int' \"int\" [int] -- int\nint /* int */";
        let out = map_unquoted(text, Protect::StringsAndIdentifiers, |s| s.replace("int", "X"));
        assert_eq!(out, "X 'int' \"int\" [int] -- int\nX /* int */");

        let out = map_unquoted("[a] 'it''s [b]'", Protect::Strings, |s| s.replace('[', "<"));
        assert_eq!(out, "<a] 'it''s [b]'");
    }

    #[test]
    fn test_batch_separators() {
        let mut log = ConversionLog::new();
        let out = batch_separators("SELECT 1\nGO\nSELECT 2\n  go  \n", &mut log);
        assert!(!out.to_lowercase().contains("go"));
        assert_eq!(out.matches(';').count(), 2);
        assert_eq!(log.entries(), &["GO -> ; (2 occurrences)".to_string()]);
    }

    #[test]
    fn test_data_types_whole_word_only() {
        let mut log = ConversionLog::new();
        let out = data_types(
            &converter(),
            "CREATE TABLE t (id int, int_value varchar(10), note nvarchar(max), blob varbinary(MAX))",
            &mut log,
        );
        assert_eq!(
            out,
            "CREATE TABLE t (id INTEGER, int_value varchar(10), note TEXT, blob BYTEA)"
        );
        assert!(log.iter().any(|e| e == "int -> INTEGER (1 occurrences)"));
    }

    #[test]
    fn test_data_types_leave_quoted_names() {
        let mut log = ConversionLog::new();
        let out = data_types(&converter(), "[Money] money, 'image' AS label", &mut log);
        assert_eq!(out, "[Money] NUMERIC(19,4), 'image' AS label");
    }

    #[test]
    fn test_data_types_are_stable_on_converted_text() {
        let mut log = ConversionLog::new();
        let first = data_types(&converter(), "a datetimeoffset, b money, c float", &mut log);
        let mut second_log = ConversionLog::new();
        let second = data_types(&converter(), &first, &mut second_log);
        assert_eq!(first, second);
        assert!(second_log.is_empty());
    }

    #[test]
    fn test_bracket_identifiers_preserve_inner_text() {
        let mut log = ConversionLog::new();
        let out = bracket_identifiers("SELECT [My Column] FROM t WHERE x LIKE '[A-Z]%'", &mut log);
        assert_eq!(out, "SELECT \"My Column\" FROM t WHERE x LIKE '[A-Z]%'");
    }

    #[test]
    fn test_schema_prefix_forms() {
        let mut log = ConversionLog::new();
        let out = schema_prefix(&converter(), "[dbo].a, \"dbo\".b, DBO.c, dbox.d", &mut log);
        assert_eq!(out, "a, b, c, dbox.d");
        assert_eq!(log.entries(), &["dbo. prefixes removed (3 occurrences)".to_string()]);
    }

    #[test]
    fn test_procedure_becomes_function() {
        let mut log = ConversionLog::new();
        let sql = indoc! {"
            CREATE PROCEDURE count_users(@limit int) RETURNS integer AS
            BEGIN
                RETURN @limit;
            END
            ;
        "};
        let out = procedures(sql, &mut log);
        assert!(out.contains("CREATE FUNCTION count_users(limit int) RETURNS integer AS $$"));
        assert!(out.contains("END\n$$ LANGUAGE plpgsql;"));
        assert!(!out.contains('@'));
    }

    #[test]
    fn test_procedure_keeps_at_signs_in_literals() {
        let mut log = ConversionLog::new();
        let sql = indoc! {"
            CREATE PROCEDURE add_admin(@email text) RETURNS void AS
            BEGIN
                INSERT INTO admins VALUES ('admin@example.com', @email);
            END
            ;
        "};
        let out = procedures(sql, &mut log);
        assert!(out.contains("CREATE FUNCTION add_admin(email text) RETURNS void AS $$"));
        assert!(out.contains("VALUES ('admin@example.com', email);"));
    }

    #[test]
    fn test_transactions() {
        let mut log = ConversionLog::new();
        let out = transactions("BEGIN TRANSACTION;\nCOMMIT TRAN;", &mut log);
        assert_eq!(out, "BEGIN;\nCOMMIT;");
    }

    #[test]
    fn test_object_id_guard_only_before_drop() {
        let mut log = ConversionLog::new();
        let sql = "IF OBJECT_ID('t', 'U') IS NOT NULL\n    DROP TABLE t;\nIF OBJECT_ID('v') IS NOT NULL\n    PRINT 'x';";
        let out = object_id_guards(sql, &mut log);
        assert!(out.starts_with("DROP TABLE t;"));
        assert!(out.contains("IF OBJECT_ID('v') IS NOT NULL"));
    }

    #[test]
    fn test_drop_index_on_table() {
        let mut log = ConversionLog::new();
        let out = drop_index("DROP INDEX IX_Users_Name ON Users;", &mut log);
        assert_eq!(out, "drop index if exists ix_users_name;");
    }

    #[test]
    fn test_drop_constraint_forms() {
        let mut log = ConversionLog::new();
        let out = drop_constraint("ALTER TABLE Orders DROP CONSTRAINT FK_Orders_Users;", &mut log);
        assert_eq!(out, "alter table orders drop constraint if exists fk_orders_users;");

        let mut log = ConversionLog::new();
        let out = drop_constraint("BEGIN\n    DROP CONSTRAINT PK_Old;\nEND", &mut log);
        assert!(out.contains("    alter table table_name drop constraint if exists pk_old;"));
        assert!(log.iter().any(|e| e.contains("review manually")));
    }

    #[test]
    fn test_drop_constraint_continuation_untouched() {
        let mut log = ConversionLog::new();
        let sql = "ALTER TABLE Orders ADD note text,\n    DROP CONSTRAINT FK_X;";
        let out = drop_constraint(sql, &mut log);
        assert_eq!(out, sql);
        assert!(log.is_empty());
    }

    #[test]
    fn test_drop_statements_get_guards() {
        let mut log = ConversionLog::new();
        let out = drop_statements("DROP TABLE Users;\nDROP INDEX ix_a;\nDROP TABLE IF EXISTS x;", &mut log);
        assert_eq!(
            out,
            "DROP TABLE IF EXISTS users CASCADE;\nDROP INDEX IF EXISTS ix_a;\nDROP TABLE IF EXISTS x;"
        );
    }

    #[test]
    fn test_timestamp_defaults() {
        let mut log = ConversionLog::new();
        let out = timestamp_defaults(
            "created TIMESTAMPTZ DEFAULT GETDATE(), id UUID DEFAULT NEWID()",
            &mut log,
        );
        assert_eq!(
            out,
            "created TIMESTAMPTZ default current_timestamp, id UUID DEFAULT gen_random_uuid()"
        );
    }

    #[test]
    fn test_lowercase_keeps_mixed_case_quoted_identifiers() {
        let mut log = ConversionLog::new();
        let sql = "CREATE TABLE \"users\" (\n\"UserName\" VARCHAR(50) NOT NULL,\n  \"email\" VARCHAR(100)\n)";
        let out = lowercase(sql, &mut log);
        assert!(out.contains("create table users ("));
        assert!(out.contains("\"UserName\" varchar(50) not null"));
        assert!(out.contains("    email varchar(100)"));
    }

    #[test]
    fn test_lowercase_keeps_reserved_names_quoted() {
        let mut log = ConversionLog::new();
        let out = lowercase("CREATE TABLE \"order\" (\n  \"user\" TEXT\n)", &mut log);
        assert!(out.contains("create table \"order\" ("));
        assert!(out.contains("\"user\" text"));
    }

    #[test]
    fn test_format_groups_drops_inside_blocks() {
        let mut log = ConversionLog::new();
        let sql = indoc! {"
            DO $$
            BEGIN
            drop index if exists ix_a;
            drop index if exists ix_b;
            drop table if exists t;
            END $$;
        "};
        let out = format_blocks(sql, &mut log);
        assert!(out.contains("    -- Drop indexes\n    drop index if exists ix_a;\n    drop index if exists ix_b;"));
        assert!(out.contains("    -- Drop tables\n    drop table if exists t cascade;"));

        let mut second = ConversionLog::new();
        assert_eq!(format_blocks(&out, &mut second), out);
        assert!(second.is_empty());
    }

    #[test]
    fn test_cleanup() {
        let mut log = ConversionLog::new();
        let out = cleanup("CREATE TABLE t (id int)\n;\n\n\n\nSELECT 1;;\n;\n", &mut log);
        assert_eq!(out, "CREATE TABLE t (id int);\n\nSELECT 1;");
    }

    #[test]
    fn test_cleanup_leaves_semicolons_in_literals() {
        let mut log = ConversionLog::new();
        let out = cleanup("INSERT INTO t VALUES ('a;;b');;", &mut log);
        assert_eq!(out, "INSERT INTO t VALUES ('a;;b');");
        assert_eq!(log.len(), 1);
    }
}
