//! Individual rewrite passes.
//!
//! Each pass is a pure text-to-text function. Passes are best-effort: a
//! construct a pass does not recognize is left exactly as written.

use super::rule::{
    apply_all, as_variable, compile, map_code, split_top_level, RewriteRule, BALANCED,
};
use super::Scope;
use crate::typemap::map_local_type;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Prefix of every advisory comment a pass leaves for manual follow-up.
pub const REVIEW: &str = "-- REVIEW:";

/// Indentation unit of translated bodies.
const INDENT: &str = "    ";

// ===== Header =====

static SOURCE_HEADER: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\A\s*AS\b\s*"));

/// Drop the `AS` keyword stored ahead of the body in trigger sources.
pub fn source_header(text: &str) -> String {
    SOURCE_HEADER.replace(text, "").into_owned()
}

// ===== Declarations =====

static DECLARE_VARIABLE: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function(
        "declare variable",
        r"(?i)\bDECLARE\s+(?:VARIABLE\s+)?(\w+)\s+([^;=]+?)(?:\s*(?:=|\bDEFAULT\b)\s*([^;]+?))?\s*;",
        |caps| {
            let declared = caps[2].trim();
            if declared.to_uppercase().starts_with("CURSOR") {
                return caps[0].to_string();
            }
            let ty = map_local_type(declared);
            match caps.get(3) {
                Some(init) => format!("DECLARE @{} {} = {};", &caps[1], ty, init.as_str().trim()),
                None => format!("DECLARE @{} {};", &caps[1], ty),
            }
        },
    )
});

/// `DECLARE VARIABLE x type [= init];` becomes `DECLARE @x type [= init];`.
pub fn declare_variables(text: &str) -> String {
    DECLARE_VARIABLE.apply(text)
}

// ===== Cursor loops =====

static FOR_SELECT_HEAD: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?is)\bFOR\s+(SELECT\s+[^;]+?)\s+INTO\s+((?:[:@]?\w+\s*,\s*)*[:@]?\w+)\s+(?:(FROM\s+[^;]+?)\s+)?DO\b(?:\s+(BEGIN)\b)?",
    )
});

static BLOCK_WORD: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(BEGIN|CASE|END)\b"));

/// `FOR SELECT ... INTO vars ... DO BEGIN ... END` becomes an explicit
/// cursor loop. A body without `BEGIN` is the single statement after `DO`.
/// Nested loops get their own cursor.
pub fn for_select_loops(text: &str) -> String {
    let mut out = text.to_string();
    let mut from = 0;
    let mut cursors = 0;

    loop {
        let Some(caps) = FOR_SELECT_HEAD.captures_at(&out, from) else {
            break;
        };
        let Some(head) = caps.get(0) else {
            break;
        };
        let (start, head_end) = (head.start(), head.end());

        let query = match caps.get(3) {
            Some(from_clause) => format!("{} {}", caps[1].trim(), from_clause.as_str().trim()),
            None => caps[1].trim().to_string(),
        };
        let vars = split_top_level(&caps[2])
            .iter()
            .map(|v| as_variable(v))
            .collect::<Vec<_>>()
            .join(", ");

        let end = if caps.get(4).is_some() {
            find_block_end(&out, head_end)
        } else {
            find_statement_end(&out, head_end).map(|end| (end, end))
        };
        let Some((body_end, block_end)) = end else {
            from = head_end;
            continue;
        };

        cursors += 1;
        let cursor = format!("cur_{}", cursors);
        let replacement = cursor_loop(&cursor, &query, &vars, out[head_end..body_end].trim());
        out.replace_range(start..block_end, &replacement);
        from = start;
    }

    out
}

/// Find the `END` closing a block whose `BEGIN` ends at `from`.
/// Returns (start of `END`, end of `END`).
fn find_block_end(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    for m in BLOCK_WORD.find_iter(&text[from..]) {
        if m.as_str().eq_ignore_ascii_case("END") {
            depth -= 1;
            if depth == 0 {
                return Some((from + m.start(), from + m.end()));
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Find the end of the single statement starting at `from`: the first `;`
/// outside literals and blocks, or the `END` closing a `BEGIN` block.
fn find_statement_end(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    // true for BEGIN, false for CASE
    let mut open: Vec<bool> = Vec::new();
    let mut in_string = false;

    for (i, c) in rest.char_indices() {
        if c == '\'' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if c == ';' && open.is_empty() {
            return Some(from + i + 1);
        }
        if keyword_at(rest, i, "BEGIN") {
            open.push(true);
        } else if keyword_at(rest, i, "CASE") {
            open.push(false);
        } else if keyword_at(rest, i, "END") {
            let closes_begin = open.pop()?;
            if closes_begin && open.is_empty() {
                let after = i + "END".len();
                let tail = &rest[after..];
                let trimmed = tail.trim_start();
                return Some(if trimmed.starts_with(';') {
                    from + after + (tail.len() - trimmed.len()) + 1
                } else {
                    from + after
                });
            }
        }
    }
    None
}

fn cursor_loop(cursor: &str, query: &str, vars: &str, body: &str) -> String {
    let body: String = body
        .lines()
        .map(|l| format!("{}{}\n", INDENT, l.trim_start()))
        .collect();
    format!(
        "DECLARE {c} CURSOR LOCAL FOR\n\
         {i}{q};\n\
         OPEN {c};\n\
         FETCH NEXT FROM {c} INTO {v};\n\
         WHILE @@FETCH_STATUS = 0\n\
         BEGIN\n\
         {b}\
         {i}FETCH NEXT FROM {c} INTO {v};\n\
         END\n\
         CLOSE {c};\n\
         DEALLOCATE {c};",
        c = cursor,
        i = INDENT,
        q = query,
        v = vars,
        b = body,
    )
}

// ===== Singleton SELECT ... INTO =====

static SELECT_INTO: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function(
        "select into",
        r"(?is)(\bFOR\s+)?\bSELECT\s+([^;]+?)\s+INTO\s+((?:[:@]?\w+\s*,\s*)*[:@]?\w+)\s*(FROM\b[^;]*)?;",
        select_into,
    )
});

static FIRST_ROWS: Lazy<Regex> = Lazy::new(|| compile(r"(?is)^FIRST\s+(\d+)\s+(.*)$"));
static COLUMN_ALIAS: Lazy<Regex> = Lazy::new(|| compile(r"(?is)^(.+)\s+AS\s+\w+$"));

fn select_into(caps: &Captures<'_>) -> String {
    if caps.get(1).is_some() {
        return caps[0].to_string();
    }

    let (list, from_clause) = match caps.get(4) {
        Some(f) => (caps[2].trim(), Some(f.as_str().trim())),
        None => split_from(&caps[2]),
    };

    let (top, list) = match FIRST_ROWS.captures(list) {
        Some(c) => (format!("TOP {} ", &c[1]), c.get(2).map_or("", |m| m.as_str())),
        None => (String::new(), list),
    };

    let columns = split_top_level(list);
    let vars = split_top_level(&caps[3]);
    if columns.is_empty() || columns.len() != vars.len() {
        return caps[0].to_string();
    }

    let assignments = vars
        .iter()
        .zip(&columns)
        .map(|(var, column)| {
            let value = COLUMN_ALIAS
                .captures(column)
                .and_then(|c| c.get(1))
                .map_or(column.as_str(), |m| m.as_str());
            format!("{} = {}", as_variable(var), value.trim())
        })
        .collect::<Vec<_>>()
        .join(", ");

    match from_clause {
        Some(f) => format!("SELECT {}{} {};", top, assignments, f),
        None => format!("SELECT {}{};", top, assignments),
    }
}

/// Split a select list from its trailing `FROM ...` clause, if any.
fn split_from(select: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, c) in select.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            _ if !in_string && depth == 0 && keyword_at(select, i, "FROM") => {
                return (select[..i].trim(), Some(select[i..].trim()));
            }
            _ => {}
        }
    }
    (select.trim(), None)
}

fn keyword_at(text: &str, i: usize, keyword: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    let rest = &text[i..];
    rest.get(..keyword.len())
        .map_or(false, |w| w.eq_ignore_ascii_case(keyword))
        && text[..i].chars().last().map_or(true, |c| !is_word(c))
        && rest[keyword.len()..].chars().next().map_or(true, |c| !is_word(c))
}

/// Singleton `SELECT cols INTO vars FROM ...;` (either clause order) becomes
/// `SELECT @var = col, ... FROM ...;`. `FIRST n` becomes `TOP n`.
pub fn select_into_statements(text: &str) -> String {
    SELECT_INTO.apply(text)
}

// ===== Result rows =====

static SUSPEND: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function("suspend", r"(?i)\bSUSPEND\s*;", |_| {
        format!(
            "{} SUSPEND removed; output values are returned by the final SELECT",
            REVIEW
        )
    })
});

pub fn suspend_statements(text: &str) -> String {
    SUSPEND.apply(text)
}

// ===== Control flow =====

static IF_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template(
            "if block",
            &format!(r"(?is)\bIF\s*\(({b}*)\)\s*THEN\s+BEGIN\b", b = BALANCED),
            "IF (${1})\nBEGIN",
        ),
        RewriteRule::template(
            "if statement",
            &format!(r"(?is)\bIF\s*\(({b}*)\)\s*THEN\s+([^;]+);", b = BALANCED),
            "IF (${1})\n    ${2};",
        ),
    ]
});

/// `IF (c) THEN` loses its `THEN`; a single statement moves to its own line.
pub fn if_statements(text: &str) -> String {
    apply_all(&IF_RULES, text)
}

static WHILE_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template(
            "while block",
            &format!(r"(?is)\bWHILE\s*\(({b}*)\)\s*DO\s+BEGIN\b", b = BALANCED),
            "WHILE (${1})\nBEGIN",
        ),
        RewriteRule::template(
            "while statement",
            &format!(r"(?is)\bWHILE\s*\(({b}*)\)\s*DO\s+([^;]+);", b = BALANCED),
            "WHILE (${1})\n    ${2};",
        ),
    ]
});

pub fn while_loops(text: &str) -> String {
    apply_all(&WHILE_RULES, text)
}

// ===== Variables =====

static SIGIL: Lazy<Regex> = Lazy::new(|| compile(r"(^|[^\w:@])[:](\w+)"));

/// `:name` references become `@name`. Literals and comments are skipped.
pub fn variable_sigils(text: &str) -> String {
    map_code(text, |code| SIGIL.replace_all(code, "${1}@${2}").into_owned())
}

static DECLARED_VARIABLE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bDECLARE\s+@(\w+)"));

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?mi)^([ \t]*(?:ELSE[ \t]+)?)(@?)([A-Za-z_]\w*)[ \t]*=[ \t]*((?:'(?:[^']|'')*'|[^;'])+);")
});

static ROW_CONTEXT_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?mi)^([ \t]*)((?:INSERTED|DELETED)\.\w+[ \t]*=[ \t]*[^;\n]+;)")
});

static CONDITION_LINE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?mi)^([ \t]*(?:ELSE[ \t]+)?(?:IF|WHILE)[ \t]*\()(.*)(\)[ \t]*)$")
});

static BARE_NAME: Lazy<Regex> = Lazy::new(|| compile(r"(^|[^\w@:.$])([A-Za-z_][\w$]*)"));

static SELECT_WORD: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bSELECT\b"));

/// Prefix known variable names in a PSQL expression with `@`. Expressions
/// holding a subquery are left alone since bare names there are columns.
fn qualify_variables(expr: &str, scope: &Scope) -> String {
    if SELECT_WORD.is_match(expr) {
        return expr.to_string();
    }
    map_code(expr, |code| {
        BARE_NAME
            .replace_all(code, |caps: &Captures<'_>| {
                if scope.declares(&caps[2]) {
                    format!("{}@{}", &caps[1], &caps[2])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    })
}

/// Statement-level `@x = v;` becomes `SET @x = v;`, also when `v` runs over
/// several lines. A bare `x = v;` is only
/// rewritten when `x` is a known variable: declared in the body or listed in
/// `scope`. Known variables used in assignment values and in `IF`/`WHILE`
/// conditions get their `@`. Assignments to row-context columns are flagged.
pub fn assignments(text: &str, scope: &Scope) -> String {
    let mut scope = scope.clone();
    for caps in DECLARED_VARIABLE.captures_iter(text) {
        scope.insert(&caps[1]);
    }

    let text = ASSIGNMENT.replace_all(text, |caps: &Captures<'_>| {
        let (indent, sigil, name, value) = (&caps[1], &caps[2], &caps[3], &caps[4]);
        if sigil == "@" || scope.declares(name) {
            format!(
                "{}SET @{} = {};",
                indent,
                name,
                qualify_variables(value.trim_end(), &scope)
            )
        } else {
            caps[0].to_string()
        }
    });

    let text = CONDITION_LINE.replace_all(&text, |caps: &Captures<'_>| {
        format!(
            "{}{}{}",
            &caps[1],
            qualify_variables(&caps[2], &scope),
            &caps[3]
        )
    });

    ROW_CONTEXT_ASSIGNMENT
        .replace_all(&text, |caps: &Captures<'_>| {
            format!(
                "{i}{} row values are read-only in SQL Server triggers; apply this with an UPDATE\n{i}{}",
                REVIEW,
                &caps[2],
                i = &caps[1],
            )
        })
        .into_owned()
}

// ===== Expressions =====

/// `a || b` becomes `a + b`.
pub fn string_concatenation(text: &str) -> String {
    map_code(text, |code| code.replace("||", "+"))
}

static CAST: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function(
        "cast",
        &format!(
            r"(?is)\bCAST\s*\(({b}+?)\s+AS\s+([A-Za-z][\w ]*?(?:\(\s*(?:\d+|MAX)(?:\s*,\s*\d+)?\s*\))?)\s*\)",
            b = BALANCED
        ),
        |caps| format!("CAST({} AS {})", caps[1].trim(), map_local_type(&caps[2])),
    )
});

/// Target types of `CAST(x AS type)` get their SQL Server spelling.
pub fn cast_expressions(text: &str) -> String {
    CAST.apply(text)
}

// ===== Exceptions =====

static RAISE_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template(
            "exception with message",
            r"(?i)\bEXCEPTION\s+(\w+)\s+('(?:[^']|'')*')\s*;",
            "THROW 50000, ${2}, 1;",
        ),
        RewriteRule::template(
            "exception",
            r"(?i)\bEXCEPTION\s+(\w+)\s*;",
            "THROW 50000, '${1}', 1;",
        ),
        RewriteRule::template("re-raise", r"(?i)\bEXCEPTION\s*;", "THROW;"),
    ]
});

/// `EXCEPTION name [message];` becomes `THROW 50000, ..., 1;`.
pub fn raise_exceptions(text: &str) -> String {
    apply_all(&RAISE_RULES, text)
}

const HANDLER_CONDITION: &str = r"(?:ANY|SQLCODE\s+-?\d+|GDSCODE\s+\w+|EXCEPTION\s+\w+)";

static HANDLER: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function(
        "exception handler",
        &format!(
            r"(?i)\bWHEN\s+({c}(?:\s*,\s*{c})*)\s+DO\b",
            c = HANDLER_CONDITION
        ),
        |caps| {
            format!(
                "{} exception handler (WHEN {} DO) needs manual conversion to TRY/CATCH\nIF 1 = 0",
                REVIEW, &caps[1]
            )
        },
    )
});

/// `WHEN ... DO` handlers are flagged and disabled; the handler body that
/// follows is kept but never runs.
pub fn exception_handlers(text: &str) -> String {
    HANDLER.apply(text)
}

// ===== Built-in functions =====

static FUNCTION_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template(
            "substring from for",
            &format!(
                r"(?is)\bSUBSTRING\s*\(\s*({b}+?)\s+FROM\s+({b}+?)\s+FOR\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            "SUBSTRING(${1}, ${2}, ${3})",
        ),
        RewriteRule::function(
            "substring from",
            &format!(
                r"(?is)\bSUBSTRING\s*\(\s*({b}+?)\s+FROM\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            |caps| format!("SUBSTRING({0}, {1}, LEN({0}))", caps[1].trim(), caps[2].trim()),
        ),
        RewriteRule::function(
            "trim",
            &format!(r"(?is)\bTRIM\s*\(({b}+)\)", b = BALANCED),
            trim_call,
        ),
        RewriteRule::template(
            "char length",
            r"(?i)\b(?:CHAR_LENGTH|CHARACTER_LENGTH)\s*\(",
            "LEN(",
        ),
        RewriteRule::template(
            "position",
            &format!(
                r"(?is)\bPOSITION\s*\(\s*({b}+?)\s+IN\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            "CHARINDEX(${1}, ${2})",
        ),
        RewriteRule::function(
            "extract",
            &format!(
                r"(?is)\bEXTRACT\s*\(\s*(YEAR|MONTH|DAY|HOUR|MINUTE|SECOND|WEEKDAY|YEARDAY)\s+FROM\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            extract_call,
        ),
        RewriteRule::template(
            "dateadd",
            &format!(
                r"(?is)\bDATEADD\s*\(\s*({b}+?)\s+(YEAR|MONTH|WEEK|DAY|HOUR|MINUTE|SECOND|MILLISECOND)\s+TO\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            "DATEADD(${2}, ${1}, ${3})",
        ),
        RewriteRule::template(
            "datediff",
            &format!(
                r"(?is)\bDATEDIFF\s*\(\s*(YEAR|MONTH|WEEK|DAY|HOUR|MINUTE|SECOND|MILLISECOND)\s+FROM\s+({b}+?)\s+TO\s+({b}+?)\s*\)",
                b = BALANCED
            ),
            "DATEDIFF(${1}, ${2}, ${3})",
        ),
        RewriteRule::template("current timestamp", r"(?i)\bCURRENT_TIMESTAMP\b", "GETDATE()"),
        RewriteRule::template(
            "current date",
            r"(?i)\bCURRENT_DATE\b",
            "CAST(GETDATE() AS DATE)",
        ),
        RewriteRule::template(
            "current time",
            r"(?i)\bCURRENT_TIME\b",
            "CAST(GETDATE() AS TIME)",
        ),
        RewriteRule::template("now literal", r"(?i)'NOW'", "GETDATE()"),
        RewriteRule::template("today literal", r"(?i)'TODAY'", "CAST(GETDATE() AS DATE)"),
    ]
});

static TRIM_SIDE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?is)^(LEADING|TRAILING|BOTH)?\s*FROM\s+(.+)$"));
static FROM_WORD: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bFROM\b"));

fn trim_call(caps: &Captures<'_>) -> String {
    let inner = caps[1].trim();
    if let Some(c) = TRIM_SIDE.captures(inner) {
        let expr = c[2].trim();
        return match c.get(1).map(|m| m.as_str().to_uppercase()).as_deref() {
            Some("LEADING") => format!("LTRIM({})", expr),
            Some("TRAILING") => format!("RTRIM({})", expr),
            _ => format!("LTRIM(RTRIM({}))", expr),
        };
    }
    if FROM_WORD.is_match(inner) {
        // TRIM(... 'x' FROM ...) with explicit characters
        return caps[0].to_string();
    }
    format!("LTRIM(RTRIM({}))", inner)
}

fn extract_call(caps: &Captures<'_>) -> String {
    let expr = caps[2].trim();
    match caps[1].to_uppercase().as_str() {
        "YEAR" => format!("YEAR({})", expr),
        "MONTH" => format!("MONTH({})", expr),
        "DAY" => format!("DAY({})", expr),
        "WEEKDAY" => format!("(DATEPART(WEEKDAY, {}) - 1)", expr),
        "YEARDAY" => format!("(DATEPART(DAYOFYEAR, {}) - 1)", expr),
        part => format!("DATEPART({}, {})", part, expr),
    }
}

/// String, date and time built-ins with a different SQL Server spelling.
pub fn builtin_functions(text: &str) -> String {
    apply_all(&FUNCTION_RULES, text)
}

// ===== Loop exits =====

static EXIT_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template("exit", r"(?i)\bEXIT\s*;", "RETURN;"),
        RewriteRule::template("leave", r"(?i)\bLEAVE\s*;", "BREAK;"),
    ]
});

pub fn exit_statements(text: &str) -> String {
    apply_all(&EXIT_RULES, text)
}

// ===== Generators =====

static GEN_ID: Lazy<RewriteRule> = Lazy::new(|| {
    RewriteRule::function(
        "gen_id",
        r"(?i)\bGEN_ID\s*\(\s*(\w+)\s*,\s*([^()]+?)\s*\)",
        |caps| {
            let (generator, increment) = (&caps[1], caps[2].trim());
            if increment == "1" {
                format!("NEXT VALUE FOR {}", generator)
            } else {
                format!(
                    "{} /* REVIEW: increment {} on sequence {} needs a manual rewrite */",
                    &caps[0], increment, generator
                )
            }
        },
    )
});

/// `GEN_ID(g, 1)` becomes `NEXT VALUE FOR g`; any other increment is kept
/// as written and flagged.
pub fn generator_calls(text: &str) -> String {
    GEN_ID.apply(text)
}

// ===== Triggers =====

static ROW_CONTEXT_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    vec![
        RewriteRule::template("new row", r"(?i):?\bNEW\.(\w+)", "INSERTED.${1}"),
        RewriteRule::template("old row", r"(?i):?\bOLD\.(\w+)", "DELETED.${1}"),
        RewriteRule::template(
            "inserting",
            r"(?i)\bINSERTING\b",
            "(EXISTS (SELECT 1 FROM INSERTED) AND NOT EXISTS (SELECT 1 FROM DELETED))",
        ),
        RewriteRule::template(
            "updating",
            r"(?i)\bUPDATING\b",
            "(EXISTS (SELECT 1 FROM INSERTED) AND EXISTS (SELECT 1 FROM DELETED))",
        ),
        RewriteRule::template(
            "deleting",
            r"(?i)\bDELETING\b",
            "(NOT EXISTS (SELECT 1 FROM INSERTED) AND EXISTS (SELECT 1 FROM DELETED))",
        ),
    ]
});

/// `NEW.x`/`OLD.x` become `INSERTED.x`/`DELETED.x`; the event predicates
/// become row-set tests.
pub fn row_context(text: &str) -> String {
    map_code(text, |code| apply_all(&ROW_CONTEXT_RULES, code))
}

// ===== Layout =====

/// Re-indent every non-blank line by one level plus its block depth.
///
/// `BEGIN` and `CASE` open a level and `END` closes one. Words inside
/// literals and comments are not counted.
pub fn reindent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut depth = 0usize;
    let mut in_comment = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            out.push('\n');
            continue;
        }

        let code = code_part(line, &mut in_comment);
        let (mut opens, mut closes) = (0usize, 0usize);
        for m in BLOCK_WORD.find_iter(&code) {
            if m.as_str().eq_ignore_ascii_case("END") {
                closes += 1;
            } else {
                opens += 1;
            }
        }
        if starts_with_word(&code.trim_start().to_uppercase(), "END") {
            depth = depth.saturating_sub(1);
            closes = closes.saturating_sub(1);
        }

        for _ in 0..=depth {
            out.push_str(INDENT);
        }
        out.push_str(line);
        out.push('\n');

        depth = (depth + opens).saturating_sub(closes);
    }

    out
}

/// The code of one line with literals blanked and comments removed.
/// `in_comment` carries an open `/* */` comment across lines.
fn code_part(line: &str, in_comment: &mut bool) -> String {
    let mut code = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if *in_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                *in_comment = false;
            }
            continue;
        }
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            code.push(' ');
            continue;
        }
        match (c, chars.peek().copied()) {
            ('\'', _) => {
                in_string = true;
                code.push(' ');
            }
            ('-', Some('-')) => break,
            ('/', Some('*')) => {
                chars.next();
                *in_comment = true;
                code.push(' ');
            }
            _ => code.push(c),
        }
    }
    code
}

fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .map_or(false, |rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}
