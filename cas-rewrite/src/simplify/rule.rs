//! Rewrite rules.

use cas_error::Error;
use crate::{
    error::{word_spans, InvalidDepth, UnboundVariable},
    matcher::{MatchCtx, NodeMatcher, PatternCompiler},
    node::Node,
};
use levenshtein::levenshtein;
use std::{fmt, rc::Rc};

/// Builds the replacement node from a match.
type BuildFn = dyn Fn(&Node, &MatchCtx) -> Option<Node>;

/// How a [`Rule`] builds the node that replaces a match.
pub enum Replacement {
    /// Fill a template in with the bindings of the match (see
    /// [`PatternCompiler::substitute`]).
    Template {
        compiler: PatternCompiler,
        template: Node,
    },

    /// Call a function with the matched node and the bindings. The function can decline to
    /// rewrite the node by returning [`None`].
    Builder {
        /// The names of the bindings the function reads.
        uses: Vec<Rc<str>>,
        build: Box<BuildFn>,
    },
}

impl Replacement {
    /// Creates a template replacement.
    pub fn template(compiler: &PatternCompiler, template: Node) -> Self {
        Self::Template { compiler: compiler.clone(), template }
    }

    /// Creates a replacement from a function, which reads the bindings named in `uses`.
    pub fn builder<F>(uses: &[&str], build: F) -> Self
    where
        F: Fn(&Node, &MatchCtx) -> Option<Node> + 'static,
    {
        Self::Builder {
            uses: uses.iter().map(|&name| Rc::from(name)).collect(),
            build: Box::new(build),
        }
    }

    /// The names of the bindings this replacement reads.
    pub fn uses(&self) -> Vec<Rc<str>> {
        match self {
            Self::Template { compiler, template } => compiler.placeholders_in(template),
            Self::Builder { uses, .. } => uses.clone(),
        }
    }

    /// Builds the replacement of the matched node.
    pub fn build(&self, node: &Node, ctx: &MatchCtx) -> Option<Node> {
        match self {
            Self::Template { compiler, template } => compiler.substitute(template, ctx),
            Self::Builder { build, .. } => build(node, ctx),
        }
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template { template, .. } => f.debug_tuple("Template").field(template).finish(),
            Self::Builder { uses, .. } => f.debug_tuple("Builder").field(uses).finish(),
        }
    }
}

/// Templates print as themselves. Builders print as `|a, b| ..`, listing the bindings they read.
impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template { template, .. } => write!(f, "{}", template),
            Self::Builder { uses, .. } => {
                let names = uses.iter().map(|name| name.as_ref()).collect::<Vec<_>>();
                write!(f, "|{}| ..", names.join(", "))
            },
        }
    }
}

/// A rewrite rule: a pattern, and how to build the node that replaces a match of it.
///
/// Rules are checked when they are created: every binding the replacement reads must be bound by
/// the pattern.
#[derive(Debug)]
pub struct Rule {
    description: Rc<str>,
    matcher: NodeMatcher,
    replacement: Replacement,

    /// How deep the output of the rule is simplified again.
    depth: usize,

    /// The rule in the form `pattern => replacement`, used in error reports.
    source: String,
}

impl Rule {
    /// Creates a rule from a compiled matcher and a replacement.
    ///
    /// Fails if the replacement reads a binding the matcher never makes.
    pub fn new(
        description: impl Into<Rc<str>>,
        matcher: NodeMatcher,
        replacement: Replacement,
    ) -> Result<Self, Error> {
        let pattern = matcher.to_string();
        Self::checked(description.into(), matcher, replacement, pattern)
    }

    /// Creates a rule from a pattern template and a replacement template, both using the
    /// placeholders of `compiler`.
    ///
    /// Fails if the pattern cannot be compiled, or if the replacement uses a placeholder the
    /// pattern never binds.
    pub fn from_templates(
        description: impl Into<Rc<str>>,
        compiler: &PatternCompiler,
        pattern: &Node,
        replacement: &Node,
    ) -> Result<Self, Error> {
        let replacement = Replacement::template(compiler, replacement.clone());
        let matcher = compiler.compile(pattern)
            .map_err(|err| Error {
                src: format!("{} => {}", pattern, replacement),
                ..err
            })?;
        Self::checked(description.into(), matcher, replacement, pattern.to_string())
    }

    fn checked(
        description: Rc<str>,
        matcher: NodeMatcher,
        replacement: Replacement,
        pattern: String,
    ) -> Result<Self, Error> {
        let prefix = format!("{} => ", pattern);
        let replacement_src = replacement.to_string();
        let source = format!("{}{}", prefix, replacement_src);

        let bound = matcher.bound_names();
        if let Some(name) = replacement.uses().into_iter().find(|name| !bound.contains(name)) {
            let shift = prefix.chars().count();
            let spans = word_spans(&replacement_src, &name)
                .into_iter()
                .map(|span| span.start + shift..span.end + shift)
                .collect();
            let suggestions = bound.iter()
                .filter(|bound| levenshtein(bound, &name) < 2)
                .map(|bound| bound.to_string())
                .collect();
            return Err(Error::new(source, spans, UnboundVariable {
                rule: description.to_string(),
                name: name.to_string(),
                suggestions,
            }));
        }

        Ok(Self {
            description,
            matcher,
            replacement,
            depth: usize::MAX,
            source,
        })
    }

    /// Sets how deep the output of this rule is simplified again after the rule applies. `1`
    /// re-examines only the output node itself, `2` also its children, and so on. By default,
    /// the whole output is simplified again.
    ///
    /// Fails if the depth is zero.
    pub fn with_depth(mut self, depth: usize) -> Result<Self, Error> {
        if depth == 0 {
            return Err(Error::new(
                self.source.clone(),
                Vec::new(),
                InvalidDepth { rule: self.description.to_string() },
            ));
        }
        self.depth = depth;
        Ok(self)
    }

    /// The description of the rule.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The compiled pattern of the rule.
    pub fn matcher(&self) -> &NodeMatcher {
        &self.matcher
    }

    /// How deep the output of the rule is simplified again.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The rule in the form `pattern => replacement`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn description_rc(&self) -> &Rc<str> {
        &self.description
    }

    /// Applies the rule to a node.
    ///
    /// Returns [`None`] if the pattern does not match, if the replacement declines, or if the
    /// replacement is equal to the node.
    pub fn apply(&self, node: &Node) -> Option<Node> {
        let mut ctx = MatchCtx::new();
        self.matcher.matches(node, &mut ctx)?;
        let output = self.replacement.build(node, &ctx)?;
        (output != *node).then_some(output)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::DuplicateRest, node::NodeKind};
    use pretty_assertions::assert_eq;
    use super::*;

    fn sym(name: &str) -> Node {
        Node::symbol(name)
    }

    fn compiler() -> PatternCompiler {
        PatternCompiler::new().var("a").var("b").rest("rest").rest("more").commutative("+")
    }

    fn render(err: &Error) -> String {
        String::from_utf8(strip_ansi_escapes::strip(err.to_string())).unwrap()
    }

    #[test]
    fn apply_template() {
        let rule = Rule::from_templates(
            "swap",
            &compiler(),
            &Node::binary("f", sym("a"), sym("b")),
            &Node::binary("f", sym("b"), sym("a")),
        ).unwrap();
        assert_eq!(rule.source(), "f(a, b) => f(b, a)");
        assert_eq!(
            rule.apply(&Node::binary("f", Node::int(1), sym("x"))),
            Some(Node::binary("f", sym("x"), Node::int(1))),
        );

        // the output equals the input
        assert_eq!(rule.apply(&Node::binary("f", sym("x"), sym("x"))), None);
        assert_eq!(rule.apply(&Node::binary("g", sym("x"), sym("y"))), None);
    }

    #[test]
    fn apply_builder() {
        let matcher = NodeMatcher::unary("neg", NodeMatcher::named("n", NodeMatcher::kind(crate::node::LeafKind::Rational)));
        let rule = Rule::new("negate constant", matcher, Replacement::builder(&["n"], |_, ctx| {
            let value = ctx.get("n")?.as_rational()?;
            Some(Node::rational(-value.clone()))
        })).unwrap();
        assert_eq!(rule.source(), "neg(n@<rational>) => |n| ..");
        assert_eq!(rule.apply(&Node::unary("neg", Node::int(3))), Some(Node::int(-3)));
        assert_eq!(rule.apply(&Node::unary("neg", sym("x"))), None);
    }

    #[test]
    fn builder_can_decline() {
        let rule = Rule::new("never", NodeMatcher::any(), Replacement::builder(&[], |_, _| None)).unwrap();
        assert_eq!(rule.apply(&sym("x")), None);
    }

    #[test]
    fn unbound_variable() {
        let err = Rule::from_templates(
            "double",
            &compiler(),
            &Node::variadic("+", [sym("a"), sym("a"), sym("rest")]),
            &Node::variadic("+", [Node::variadic("*", [Node::int(2), sym("b")]), sym("rest")]),
        ).unwrap_err();

        assert_eq!(err.src, "+(a, a, rest) => +(*(2, b), rest)");
        assert_eq!(err.spans, vec![24..25]);
        let kind = err.downcast_ref::<UnboundVariable>().unwrap();
        assert_eq!(kind.name, "b");
        assert_eq!(kind.suggestions, vec!["a".to_string()]);

        let text = render(&err);
        assert!(text.contains("rule `double` uses the unbound variable `b`"));
        assert!(text.contains("did you mean `a`?"));
    }

    #[test]
    fn unbound_in_builder() {
        let err = Rule::new(
            "reads x",
            NodeMatcher::unary("sin", NodeMatcher::reference("y")),
            Replacement::builder(&["x"], |node, _| Some(node.clone())),
        ).unwrap_err();
        assert_eq!(err.src, "sin(?y) => |x| ..");
        assert_eq!(err.spans, vec![12..13]);
    }

    #[test]
    fn duplicate_rest_in_rule() {
        let err = Rule::from_templates(
            "two rests",
            &compiler(),
            &Node::variadic("+", [sym("rest"), sym("more")]),
            &sym("rest"),
        ).unwrap_err();
        assert_eq!(err.src, "+(rest, more) => rest");
        assert!(err.downcast_ref::<DuplicateRest>().is_some());
    }

    #[test]
    fn zero_depth() {
        let rule = Rule::from_templates("id", &compiler(), &sym("a"), &Node::unary("f", sym("a"))).unwrap();
        let err = rule.with_depth(0).unwrap_err();
        assert!(err.downcast_ref::<InvalidDepth>().is_some());
        assert!(render(&err).contains("rule `id` has a re-simplification depth of zero"));

        let rule = Rule::from_templates("id", &compiler(), &sym("a"), &Node::unary("f", sym("a"))).unwrap();
        assert_eq!(rule.with_depth(2).unwrap().depth(), 2);
    }

    #[test]
    fn variadic_replacement_splices() {
        let rule = Rule::from_templates(
            "drop first",
            &compiler(),
            &Node::variadic("+", [Node::unary("drop", sym("a")), sym("rest")]),
            &Node::variadic("+", [sym("rest")]),
        ).unwrap();
        let output = rule.apply(&Node::variadic("+", [sym("x"), Node::unary("drop", sym("y")), sym("z")])).unwrap();
        assert!(matches!(output.kind(), NodeKind::Variadic(_, children) if children.len() == 2));
        assert_eq!(output, Node::variadic("+", [sym("x"), sym("z")]));
    }

    #[test]
    fn swap_keeps_nested_argument() {
        let rule = Rule::from_templates(
            "swap",
            &compiler(),
            &Node::variadic("g", [sym("a"), sym("b")]),
            &Node::variadic("g", [sym("b"), sym("a")]),
        ).unwrap();
        let inner = Node::variadic("g", [Node::int(1), Node::int(2)]);
        let output = rule.apply(&Node::variadic("g", [inner.clone(), sym("z")])).unwrap();
        assert_eq!(output, Node::variadic("g", [sym("z"), inner]));
    }
}
