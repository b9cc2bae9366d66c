//! `GO` batch separation.

use super::Statement;

/// Split a statement block into executable batches.
///
/// A separator is a line consisting only of `GO` (any case, surrounding
/// whitespace ignored). Batches that contain only whitespace are dropped.
pub fn split_batches(block: &str) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();

    for line in block.lines() {
        if line.trim().eq_ignore_ascii_case("GO") {
            push_batch(&mut batches, &mut current);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_batch(&mut batches, &mut current);
    batches
}

fn push_batch(batches: &mut Vec<String>, current: &mut String) {
    let batch = current.trim();
    if !batch.is_empty() {
        batches.push(batch.to_string());
    }
    current.clear();
}

/// Render statements as one SQL script.
///
/// Statements that do not already end a batch are followed by `GO` so the
/// script runs unchanged in sqlcmd or SSMS.
pub fn render_script(statements: &[Statement]) -> String {
    let mut script = String::new();
    for statement in statements {
        let sql = statement.sql.trim_end();
        script.push_str(sql);
        script.push('\n');
        let ends_batch = sql
            .lines()
            .last()
            .map(|l| l.trim().eq_ignore_ascii_case("GO"))
            .unwrap_or(false);
        if !ends_batch {
            script.push_str("GO\n");
        }
        script.push('\n');
    }
    script
}
