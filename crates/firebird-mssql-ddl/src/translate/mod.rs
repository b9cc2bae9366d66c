//! PSQL to T-SQL body translation.
//!
//! A body is run through an ordered list of rewrite passes. Order matters:
//! later passes assume the forms produced by earlier ones (for example
//! assignments are rewritten only after `:var` references became `@var`).
//! Every pass is best-effort; text a pass does not recognize is passed
//! through unchanged, and constructs that cannot be translated
//! automatically are marked with a `-- REVIEW:` comment.

mod passes;
mod rule;

pub use passes::REVIEW;
pub use rule::{apply_all, map_code, split_top_level, Replacement, RewriteRule};

use std::collections::HashSet;
use tracing::trace;

/// Body emitted in place of a missing or blank source.
pub const MISSING_SOURCE: &str = "    -- Source code not available\n";

/// Names known to be variables in the body being translated.
///
/// Variables declared inside the body are picked up automatically. Names
/// declared elsewhere (procedure parameters) are supplied by the caller so
/// bare assignments to them are recognized.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashSet<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut scope = Self::new();
        for name in names {
            scope.insert(name.as_ref());
        }
        scope
    }

    pub fn insert(&mut self, name: &str) {
        self.variables
            .insert(name.trim_start_matches([':', '@']).to_uppercase());
    }

    /// Case-insensitive membership test.
    pub fn declares(&self, name: &str) -> bool {
        self.variables
            .contains(&name.trim_start_matches([':', '@']).to_uppercase())
    }
}

#[derive(Clone, Copy)]
enum Step {
    Text(fn(&str) -> String),
    Scoped(fn(&str, &Scope) -> String),
}

/// A named translation pass.
#[derive(Clone, Copy)]
pub struct Pass {
    pub name: &'static str,
    step: Step,
}

impl Pass {
    pub fn run(&self, text: &str, scope: &Scope) -> String {
        match self.step {
            Step::Text(f) => f(text),
            Step::Scoped(f) => f(text, scope),
        }
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Pass").field(&self.name).finish()
    }
}

const fn text(name: &'static str, f: fn(&str) -> String) -> Pass {
    Pass {
        name,
        step: Step::Text(f),
    }
}

const fn scoped(name: &'static str, f: fn(&str, &Scope) -> String) -> Pass {
    Pass {
        name,
        step: Step::Scoped(f),
    }
}

/// Passes applied to stored procedure bodies, in order.
pub static PROCEDURE_PIPELINE: &[Pass] = &[
    text("source header", passes::source_header),
    text("variable declarations", passes::declare_variables),
    text("cursor loops", passes::for_select_loops),
    text("singleton selects", passes::select_into_statements),
    text("result rows", passes::suspend_statements),
    text("conditionals", passes::if_statements),
    text("while loops", passes::while_loops),
    text("variable references", passes::variable_sigils),
    scoped("assignments", passes::assignments),
    text("string concatenation", passes::string_concatenation),
    text("casts", passes::cast_expressions),
    text("exceptions", passes::raise_exceptions),
    text("exception handlers", passes::exception_handlers),
    text("built-in functions", passes::builtin_functions),
    text("loop exits", passes::exit_statements),
    text("generators", passes::generator_calls),
];

/// Passes applied to trigger bodies, in order.
///
/// Row context runs before variable references so `:NEW.x` is not
/// mistaken for a variable. Cursor loops and generators run after control flow.
pub static TRIGGER_PIPELINE: &[Pass] = &[
    text("source header", passes::source_header),
    text("row context", passes::row_context),
    text("variable references", passes::variable_sigils),
    text("variable declarations", passes::declare_variables),
    text("conditionals", passes::if_statements),
    text("while loops", passes::while_loops),
    scoped("assignments", passes::assignments),
    text("string concatenation", passes::string_concatenation),
    text("casts", passes::cast_expressions),
    text("built-in functions", passes::builtin_functions),
    text("exceptions", passes::raise_exceptions),
    text("cursor loops", passes::for_select_loops),
    text("singleton selects", passes::select_into_statements),
    text("generators", passes::generator_calls),
    text("exception handlers", passes::exception_handlers),
    text("loop exits", passes::exit_statements),
];

/// Run `pipeline` over `source` and re-indent the result.
///
/// A blank source yields [`MISSING_SOURCE`].
pub fn run_pipeline(pipeline: &[Pass], source: &str, scope: &Scope) -> String {
    if source.trim().is_empty() {
        return MISSING_SOURCE.to_string();
    }

    let translated = pipeline.iter().fold(source.to_string(), |body, pass| {
        let next = pass.run(&body, scope);
        if next != body {
            trace!("pass '{}' rewrote body", pass.name);
        }
        next
    });

    passes::reindent(&translated)
}

/// Translate a stored procedure body.
pub fn translate_procedure_body(source: &str) -> String {
    translate_procedure_body_in(source, &Scope::new())
}

/// Translate a stored procedure body whose parameters are listed in `scope`.
pub fn translate_procedure_body_in(source: &str, scope: &Scope) -> String {
    run_pipeline(PROCEDURE_PIPELINE, source, scope)
}

/// Translate a trigger body.
pub fn translate_trigger_body(source: &str) -> String {
    run_pipeline(TRIGGER_PIPELINE, source, &Scope::new())
}
