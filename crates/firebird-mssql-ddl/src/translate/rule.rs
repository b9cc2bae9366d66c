//! Pattern-driven rewrite rules and the text helpers passes share.

use regex::{Captures, Regex};

/// Regex fragment for one unit of a parenthesized argument: a character that
/// is not a parenthesis, or a group nested up to three levels deep.
pub(crate) const BALANCED: &str =
    r"(?:[^()]|\((?:[^()]|\((?:[^()]|\([^()]*\))*\))*\))";

/// Compile a pattern literal.
///
/// # Panics
///
/// Panics if `pattern` is not a valid regex. Patterns are compile-time
/// constants, so this only fires on a programming error.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {:?}: {}", pattern, e))
}

/// How a rule produces the replacement for one match.
#[derive(Clone, Copy)]
pub enum Replacement {
    /// Regex replacement template (`${1}` style group references).
    Template(&'static str),
    /// Function of the captures. Returning `caps[0]` leaves the match as is.
    Function(fn(&Captures<'_>) -> String),
}

/// One textual rewrite: every match of `pattern` is replaced.
pub struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: Replacement,
}

impl RewriteRule {
    /// Build a rule from a pattern literal. See [`compile`].
    pub fn new(name: &'static str, pattern: &str, replacement: Replacement) -> Self {
        Self {
            name,
            pattern: compile(pattern),
            replacement,
        }
    }

    pub fn template(name: &'static str, pattern: &str, template: &'static str) -> Self {
        Self::new(name, pattern, Replacement::Template(template))
    }

    pub fn function(
        name: &'static str,
        pattern: &str,
        f: fn(&Captures<'_>) -> String,
    ) -> Self {
        Self::new(name, pattern, Replacement::Function(f))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Apply the rule to every non-overlapping match.
    pub fn apply(&self, text: &str) -> String {
        match self.replacement {
            Replacement::Template(t) => self.pattern.replace_all(text, t).into_owned(),
            Replacement::Function(f) => self
                .pattern
                .replace_all(text, |caps: &Captures<'_>| f(caps))
                .into_owned(),
        }
    }
}

impl std::fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Apply rules in order.
pub fn apply_all(rules: &[RewriteRule], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Apply `f` to the parts of `text` that are code, leaving string literals
/// and comments untouched.
pub fn map_code(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut code_start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let verbatim_end = match bytes[i] {
            b'\'' => Some(find_from(text, i + 1, "'").map(|p| p + 1).unwrap_or(text.len())),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                Some(find_from(text, i + 2, "\n").unwrap_or(text.len()))
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                Some(find_from(text, i + 2, "*/").map(|p| p + 2).unwrap_or(text.len()))
            }
            _ => None,
        };

        match verbatim_end {
            Some(end) => {
                out.push_str(&f(&text[code_start..i]));
                out.push_str(&text[i..end]);
                i = end;
                code_start = end;
            }
            None => i += 1,
        }
    }

    out.push_str(&f(&text[code_start..]));
    out
}

fn find_from(text: &str, from: usize, needle: &str) -> Option<usize> {
    text[from..].find(needle).map(|p| p + from)
}

/// Split on commas that are not nested inside parentheses or string literals.
pub fn split_top_level(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut current = String::new();

    for c in list.chars() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Normalize a variable reference to the `@name` form.
pub fn as_variable(reference: &str) -> String {
    format!("@{}", reference.trim().trim_start_matches([':', '@']))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_rule() {
        let rule = RewriteRule::template("exit", r"(?i)\bEXIT\s*;", "RETURN;");
        assert_eq!(rule.apply("IF (x) THEN exit;"), "IF (x) THEN RETURN;");
        assert_eq!(rule.name(), "exit");
    }

    #[test]
    fn test_function_rule_can_decline() {
        let rule = RewriteRule::function("even", r"\d+", |caps| {
            let n: u32 = caps[0].parse().unwrap_or(1);
            if n % 2 == 0 {
                "even".to_string()
            } else {
                caps[0].to_string()
            }
        });
        assert_eq!(rule.apply("1 2 3 4"), "1 even 3 even");
    }

    #[test]
    fn test_apply_all_runs_in_order() {
        let rules = vec![
            RewriteRule::template("a", "a", "b"),
            RewriteRule::template("b", "b", "c"),
        ];
        assert_eq!(apply_all(&rules, "a"), "c");
    }

    #[test]
    fn test_map_code_skips_literals_and_comments() {
        let text = "x || 'a || b' -- c || d\n|| /* e || f */ y";
        let out = map_code(text, |s| s.replace("||", "+"));
        assert_eq!(out, "x + 'a || b' -- c || d\n+ /* e || f */ y");
    }

    #[test]
    fn test_map_code_handles_escaped_quotes() {
        let out = map_code("'it''s' || x", |s| s.replace("||", "+"));
        assert_eq!(out, "'it''s' + x");
    }

    #[test]
    fn test_map_code_unterminated_literal() {
        let out = map_code("a || 'open", |s| s.replace("||", "+"));
        assert_eq!(out, "a + 'open");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("A, COALESCE(B, 0), 'x,y', C"),
            vec!["A", "COALESCE(B, 0)", "'x,y'", "C"]
        );
        assert!(split_top_level("  ").is_empty());
    }

    #[test]
    fn test_as_variable() {
        assert_eq!(as_variable(":TOTAL"), "@TOTAL");
        assert_eq!(as_variable(" @TOTAL "), "@TOTAL");
        assert_eq!(as_variable("TOTAL"), "@TOTAL");
    }
}
