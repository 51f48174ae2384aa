//! Expansion of the C template.
//!
//! The template is ordinary C text with markers: `$` followed by a maximal
//! run of word characters (`[A-Za-z0-9_]`) names a substitution point, `$`
//! followed by any other character stands for that character, so `$$` is a
//! literal dollar sign.

use crate::{Error, Result};

/// Longest marker name accepted.
pub const MAX_MARKER_LENGTH: usize = 64;

fn is_word_character(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Copies `template`, replacing every marker by what `substitute` writes for it.
///
/// `substitute` receives the marker name and the output so far. It returns
/// [`Error::UnknownMarker`] for names it does not know.
///
/// # Errors
///
/// Returns [`Error::MalformedTemplate`] when the template ends right after a
/// `$` or a marker name is longer than [`MAX_MARKER_LENGTH`], and passes on
/// the errors of `substitute`.
pub fn expand_template<F>(template: &str, mut substitute: F) -> Result<String>
where
    F: FnMut(&str, &mut String) -> Result<()>,
{
    let mut out = String::with_capacity(template.len() * 2);
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let Some(&(start, next)) = chars.peek() else {
            return Err(Error::MalformedTemplate("template ends after `$`".to_string()));
        };
        if !is_word_character(next) {
            out.push(next);
            chars.next();
            continue;
        }

        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if !is_word_character(c) {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }

        let name = &template[start..end];
        if name.len() > MAX_MARKER_LENGTH {
            return Err(Error::MalformedTemplate(format!(
                "marker `{}...` is longer than {MAX_MARKER_LENGTH} characters",
                &name[..16]
            )));
        }
        substitute(name, &mut out)?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(name: &str, out: &mut String) -> Result<()> {
        match name {
            "l" => out.push('9'),
            "code_1" => out.push_str("a = 1;"),
            other => return Err(Error::UnknownMarker(other.to_string())),
        }
        Ok(())
    }

    #[test]
    fn test_markers_are_substituted() {
        let out = expand_template("float t[$l]; $code_1\n", numbers).unwrap();
        assert_eq!(out, "float t[9]; a = 1;\n");
    }

    #[test]
    fn test_dollar_escapes_non_word_characters() {
        let out = expand_template("cost: $$5 ($l)", numbers).unwrap();
        assert_eq!(out, "cost: $5 (9)");
    }

    #[test]
    fn test_marker_ends_at_first_non_word_character() {
        let out = expand_template("$l-$l.", numbers).unwrap();
        assert_eq!(out, "9-9.");
    }

    #[test]
    fn test_unknown_marker() {
        let err = expand_template("$nope", numbers).unwrap_err();
        assert!(matches!(err, Error::UnknownMarker(name) if name == "nope"));
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            expand_template("trailing $", numbers),
            Err(Error::MalformedTemplate(_))
        ));
        let long = format!("${}", "a".repeat(MAX_MARKER_LENGTH + 1));
        assert!(matches!(
            expand_template(&long, numbers),
            Err(Error::MalformedTemplate(_))
        ));
    }
}
