//! Helpers over grant statement text.
//!
//! Statements are opaque here: syntax checking belongs to the procedure
//! that executes them. These helpers only trim, preview and mirror text.

/// Whether a statement is empty once surrounding whitespace is removed.
pub fn is_blank(statement: &str) -> bool {
    statement.trim().is_empty()
}

/// Shorten a statement for tabular display, appending `...` when cut.
pub fn preview(statement: &str, max_chars: usize) -> String {
    let mut chars = statement.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &statement[..cut]),
        None => statement.to_string(),
    }
}

/// Trailing clause that a `REVOKE` must not carry.
const GRANT_OPTION: &str = " WITH GRANT OPTION";

/// Mirror a `GRANT <privilege> TO <grantee>` statement into its
/// `REVOKE <privilege> FROM <grantee>` counterpart.
///
/// A trailing `WITH GRANT OPTION` is dropped. Returns `None` when the text
/// does not have that shape.
pub fn revoke_statement_for(grant_statement: &str) -> Option<String> {
    let mut trimmed = grant_statement.trim().trim_end_matches(';').trim_end();
    if trimmed.to_ascii_uppercase().ends_with(GRANT_OPTION) {
        trimmed = trimmed.get(..trimmed.len() - GRANT_OPTION.len())?.trim_end();
    }
    let upper = trimmed.to_ascii_uppercase();

    if !upper.starts_with("GRANT ") {
        return None;
    }
    let to_at = upper.rfind(" TO ")?;
    // `get` rather than indexing: in "GRANT TO x" the keyword overlaps the prefix.
    let privilege = trimmed.get("GRANT ".len()..to_at)?.trim();
    let grantee = trimmed.get(to_at + " TO ".len()..)?.trim();
    if privilege.is_empty() || grantee.is_empty() {
        return None;
    }

    Some(format!("REVOKE {} FROM {};", privilege, grantee))
}
