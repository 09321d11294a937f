//! Field and table name quoting.
//!
//! Names are wrapped in backticks unless they already look like an expression: anything
//! containing `,`, `(`, a space, a backtick or a `.` is written verbatim. That covers
//! qualified names (`t.id`), function calls (`count(1)`), ordering (`id desc`) and names the
//! caller quoted by hand.

const EXPRESSION_CHARS: [char; 5] = [',', '(', ' ', '`', '.'];

/// Whether `name` is a bare identifier that should be backtick-quoted.
pub fn needs_quoting(name: &str) -> bool {
    !name.is_empty() && !name.contains(EXPRESSION_CHARS)
}

/// Append `name` to `out`, quoted when it is a bare identifier. Empty names write nothing.
pub fn write_field(out: &mut String, name: &str) {
    if name.is_empty() {
        return;
    }
    if needs_quoting(name) {
        out.push('`');
        out.push_str(name);
        out.push('`');
    } else {
        out.push_str(name);
    }
}

/// Owned form of [`write_field`].
pub fn escape_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_field(&mut out, name);
    out
}
