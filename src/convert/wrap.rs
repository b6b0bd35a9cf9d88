//! Top-level control-flow rewrites for scripts without `DO $$` blocks.

use super::rules::starts_with_ignore_case;
use super::{ConversionLog, Converter};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ALWAYS_TRUE_DDL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\bdeclare\s+@(\w+)\s+(?:boolean|bit)\s*=\s*1\s*;?[^;]*?\bif\s+@(\w+)\s*=\s*1\s*begin\s+((?:\s*(?:--[^\n]*\n\s*)*(?:drop|alter|create)\s+(?:table|index|constraint)[^;]*;)+)(?:\s*--[^\n]*)*\s*end\b[ \t]*;?",
    )
    .unwrap()
});
static DDL_DROP_GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bdrop\s+(table|index|constraint)\s+(if\s+exists\s+)?").unwrap()
});

static IF_EXISTS_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bIF\s+EXISTS\s*\(([^)]+)\)\s*BEGIN\s+").unwrap());
static END_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bend\b").unwrap());
static FOLLOWED_BY_IF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[ \t]+IF\b").unwrap());
static TRAILING_TERMINATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*;").unwrap());
static SIMPLE_BRACKET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(\w+)\]").unwrap());

static IDENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bIDENTITY\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)").unwrap());

/// `DECLARE @flag BOOLEAN = 1; IF @flag = 1 BEGIN <ddl> END` always runs its
/// body, so the body replaces the whole construct.
pub(super) fn eliminate_always_true_ddl(sql: &str, log: &mut ConversionLog) -> String {
    let mut eliminated = 0;
    let text = ALWAYS_TRUE_DDL.replace_all(sql, |caps: &Captures| {
        if !caps[1].eq_ignore_ascii_case(&caps[2]) {
            return caps[0].to_string();
        }
        eliminated += 1;
        flatten_ddl(&caps[3])
    });

    if eliminated > 0 {
        log.push(format!(
            "[OK] DECLARE + IF (DDL-only) -> direct DDL ({})",
            eliminated
        ));
    }
    text.into_owned()
}

fn flatten_ddl(body: &str) -> String {
    let mut lines = Vec::new();
    for chunk in body.split_inclusive(';') {
        let mut statement = Vec::new();
        for line in chunk.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with("--") && statement.is_empty() {
                lines.push(trimmed.to_string());
            } else {
                statement.push(trimmed);
            }
        }
        if !statement.is_empty() {
            lines.push(normalize_ddl_statement(&statement.join(" ")));
        }
    }
    lines.join("\n")
}

fn normalize_ddl_statement(statement: &str) -> String {
    let guarded = DDL_DROP_GUARD.replace_all(statement, |caps: &Captures| {
        if caps.get(2).is_some() {
            caps[0].to_string()
        } else {
            format!("drop {} if exists ", caps[1].to_lowercase())
        }
    });
    let mut result = guarded.trim().to_string();

    if !starts_with_ignore_case(&result, "drop") {
        return result;
    }
    if starts_with_ignore_case(&result, "drop table") && !result.to_lowercase().contains("cascade")
    {
        let bare = result.trim_end_matches(';').trim_end();
        result = format!("{} cascade;", bare);
    }
    if !result.contains('"') {
        result = result.to_lowercase();
    }
    result
}

/// `IF EXISTS (cond) BEGIN body END` becomes an anonymous PL/pgSQL block.
///
/// The condition may not contain a closing parenthesis, and the body ends at the
/// first `END` that is not followed by `IF` on the same line.
pub(super) fn wrap_if_exists(cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    let mut wrapped = 0;

    while let Some(caps) = IF_EXISTS_OPEN.captures(rest) {
        let (Some(open), Some(condition)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let body_start = open.end();
        let close = END_WORD
            .find_iter(&rest[body_start..])
            .find(|m| !FOLLOWED_BY_IF.is_match(&rest[body_start + m.end()..]));
        let Some(close) = close else {
            break;
        };

        let body = &rest[body_start..body_start + close.start()];
        let mut after = body_start + close.end();
        if let Some(terminator) = TRAILING_TERMINATOR.find(&rest[after..]) {
            after += terminator.end();
        }

        out.push_str(&rest[..open.start()]);
        out.push_str(&render_exists_block(cx, condition.as_str().trim(), body));
        wrapped += 1;
        rest = &rest[after..];
    }
    out.push_str(rest);

    if wrapped > 0 {
        log.push(format!("[OK] IF EXISTS -> DO $$ block ({})", wrapped));
    }
    out
}

fn render_exists_block(cx: &Converter, condition: &str, body: &str) -> String {
    let body = cx.schema_prefix.replace_all(body, "");
    let body = SIMPLE_BRACKET.replace_all(&body, "$1");
    let body = body.trim().trim_end_matches(';').trim_end();
    format!(
        "DO $$\nBEGIN\n    IF EXISTS ({}) THEN\n        {};\n    END IF;\nEND $$;",
        condition, body
    )
}

pub(super) fn identity_columns(cx: &Converter, sql: &str, log: &mut ConversionLog) -> String {
    let clause = cx.options.identity.clause();
    let mut converted = 0;
    let text = IDENTITY.replace_all(sql, |caps: &Captures| {
        converted += 1;
        if &caps[1] == "1" && &caps[2] == "1" {
            clause.to_string()
        } else {
            format!(
                "{} (START WITH {} INCREMENT BY {})",
                clause, &caps[1], &caps[2]
            )
        }
    });

    if converted > 0 {
        log.push(format!(
            "IDENTITY -> {} ({} occurrences)",
            clause, converted
        ));
    }
    text.into_owned()
}
