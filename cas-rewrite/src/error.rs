//! Errors that can occur while building rules and patterns.
//!
//! All of them are mistakes in the definition of a rule, reported when the rule is created, not
//! when it is first used. Each error is a [`cas_error::Error`] whose source text is the rule as
//! rendered by [`Rule::source`](crate::Rule::source), so the report can point at the offending
//! part of the rule.

use cas_attrs::ErrorKind;
use cas_error::ErrorKind;
use std::ops::Range;

/// The replacement of a rule uses a variable that its pattern never binds.
#[derive(Debug, Clone, PartialEq, ErrorKind)]
#[error(
    message = format!("rule `{}` uses the unbound variable `{}`", rule, name),
    labels = ["this variable is never bound by the pattern"],
    help = if suggestions.is_empty() {
        "bind the variable in the pattern, or remove it from the replacement".to_string()
    } else {
        let list = suggestions.iter()
            .map(|name| format!("`{}`", name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("did you mean {}?", list)
    },
)]
pub struct UnboundVariable {
    /// The description of the rule.
    pub rule: String,

    /// The name of the unbound variable.
    pub name: String,

    /// Bound variables with a similar name.
    pub suggestions: Vec<String>,
}

/// A commutative pattern node has more than one remainder placeholder.
#[derive(Debug, Clone, PartialEq, ErrorKind)]
#[error(
    message = format!("`{}` pattern captures its remainder more than once", op),
    labels = ["first remainder", "second remainder"],
    help = "the leftover children of a node can only be captured by one placeholder",
)]
pub struct DuplicateRest {
    /// The operator of the offending pattern node.
    pub op: String,
}

/// A rule asked for its output to be re-simplified to a depth of zero.
#[derive(Debug, Clone, PartialEq, ErrorKind)]
#[error(
    message = format!("rule `{}` has a re-simplification depth of zero", rule),
    labels = [""],
    help = "use a depth of at least 1, so the output of the rule is examined by the other rules",
)]
pub struct InvalidDepth {
    /// The description of the rule.
    pub rule: String,
}

/// Returns the character ranges in `src` where `word` appears as a whole identifier.
pub(crate) fn word_spans(src: &str, word: &str) -> Vec<Range<usize>> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    if word.is_empty() {
        return Vec::new();
    }

    src.match_indices(word)
        .filter(|(start, _)| {
            let before = src[..*start].chars().next_back();
            let after = src[start + word.len()..].chars().next();
            !before.map_or(false, is_ident) && !after.map_or(false, is_ident)
        })
        .map(|(start, _)| {
            let start = src[..start].chars().count();
            start..start + word.chars().count()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cas_error::Error;
    use pretty_assertions::assert_eq;
    use super::*;

    fn render(err: &Error) -> String {
        String::from_utf8(strip_ansi_escapes::strip(err.to_string())).unwrap()
    }

    #[test]
    fn whole_words_only() {
        let src = "+(x, xs, f(x)) => x_1";
        assert_eq!(word_spans(src, "x"), vec![2..3, 11..12]);
        assert_eq!(word_spans(src, "xs"), vec![5..7]);
        assert_eq!(word_spans(src, "x_1"), vec![18..21]);
        assert!(word_spans(src, "").is_empty());
    }

    #[test]
    fn unbound_report() {
        let kind = UnboundVariable {
            rule: "double".to_string(),
            name: "aa".to_string(),
            suggestions: vec!["a".to_string()],
        };
        let err = Error::new("+(a, a) => *(2, aa)", word_spans("+(a, a) => *(2, aa)", "aa"), kind);
        assert_eq!(err.spans, vec![16..18]);

        let text = render(&err);
        assert!(text.contains("rule `double` uses the unbound variable `aa`"));
        assert!(text.contains("this variable is never bound by the pattern"));
        assert!(text.contains("did you mean `a`?"));
    }

    #[test]
    fn invalid_depth_report() {
        let err = Error::new("x => y", vec![], InvalidDepth { rule: "r".to_string() });
        assert!(render(&err).contains("re-simplification depth of zero"));
        assert_eq!(err.downcast_ref::<InvalidDepth>().map(|kind| kind.rule.as_str()), Some("r"));
    }
}
