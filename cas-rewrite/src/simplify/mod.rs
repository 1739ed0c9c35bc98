//! Bottom-up, fixed-point simplification of expression trees.
//!
//! A [`Simplifier`] holds a set of [`Rule`]s, indexed in a [`TreeDispatcher`]. Simplifying a node
//! first simplifies its children, then repeatedly applies the first rule that rewrites the node,
//! until no rule does. The output of a rule is itself simplified again, down to the rule's
//! [depth](Rule::with_depth).
//!
//! Simplification always terminates: every top-level call may apply at most
//! [`Simplifier::with_max_steps`] rewrites (10 000 by default). A call that runs out of steps
//! returns the tree as it is at that point, with [`Outcome::BudgetExhausted`].
//!
//! Nodes found to be fixed points are marked with the [`SimplifiedBy`] side table key, holding
//! the id of the simplifier. Simplifying a marked node again with the same simplifier returns it
//! immediately.

pub mod rule;
pub mod rules;
pub mod step;

use cas_error::Error;
use crate::{dispatch::TreeDispatcher, node::{Node, SimplifiedBy}};
use rule::Rule;
use std::{
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};
use step::{Step, StepCollector};
use tracing::{debug, trace, warn};

/// The default maximum number of rewrites in one call to [`Simplifier::simplify`].
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Source of simplifier ids.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// How a simplification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No rule applies to any node that was examined.
    FixedPoint,

    /// The step budget ran out while rules still applied.
    BudgetExhausted,
}

/// The result of a simplification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simplification {
    /// The simplified node.
    pub node: Node,

    /// How the simplification ended.
    pub outcome: Outcome,

    /// The number of rewrites applied.
    pub steps: usize,
}

/// State of one top-level simplification.
struct Run<'c> {
    steps: usize,
    exhausted: bool,
    collector: &'c mut dyn StepCollector<Step>,
}

/// A set of rewrite rules, and the driver that applies them to a tree until it stops changing.
///
/// For more information, see the [module-level documentation](self).
#[derive(Debug)]
pub struct Simplifier {
    /// Identifies the rule set in the [`SimplifiedBy`] marks. Changes whenever a rule is added.
    id: u64,
    rules: Vec<Rule>,

    /// Maps matchers to indices into `rules`.
    dispatcher: TreeDispatcher<usize>,
    max_steps: usize,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    /// Creates a simplifier with no rules.
    pub fn new() -> Self {
        Self {
            id: next_id(),
            rules: Vec::new(),
            dispatcher: TreeDispatcher::new(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Creates a simplifier with the given rules.
    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut simplifier = Self::new();
        for rule in rules {
            simplifier.add_rule(rule);
        }
        simplifier
    }

    /// Creates a simplifier with the built-in arithmetic rules (see [`rules::all`]).
    pub fn with_default_rules() -> Result<Self, Error> {
        Ok(Self::with_rules(rules::all()?))
    }

    /// Sets the maximum number of rewrites in one call to [`Simplifier::simplify`].
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Adds a rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.dispatcher.register(rule.matcher(), self.rules.len());
        self.rules.push(rule);
        self.id = next_id();
    }

    /// The rules of this simplifier, in the order they were added.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The id this simplifier marks its fixed points with.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Simplifies a node, examining it down to the given depth: `0` returns the node unchanged,
    /// `1` only rewrites the node itself, `2` also its children, and so on.
    pub fn simplify(&self, node: &Node, depth: usize) -> Simplification {
        self.simplify_with(node, depth, &mut ())
    }

    /// Simplifies a whole tree.
    pub fn simplify_full(&self, node: &Node) -> Node {
        self.simplify(node, usize::MAX).node
    }

    /// Simplifies a whole tree, also returning every rewrite that was applied, in order.
    pub fn simplify_with_steps(&self, node: &Node) -> (Node, Vec<Step>) {
        let mut steps = Vec::new();
        let node = self.simplify_with(node, usize::MAX, &mut steps).node;
        (node, steps)
    }

    /// Simplifies a node down to the given depth, passing every applied rewrite to `collector`.
    pub fn simplify_with(
        &self,
        node: &Node,
        depth: usize,
        collector: &mut dyn StepCollector<Step>,
    ) -> Simplification {
        let mut run = Run { steps: 0, exhausted: false, collector };
        let (node, _) = self.simplify_node(node, depth, &mut run);

        let outcome = if run.exhausted {
            warn!(max_steps = self.max_steps, node = %node, "simplification budget exhausted");
            Outcome::BudgetExhausted
        } else {
            debug!(steps = run.steps, node = %node, "simplification reached a fixed point");
            Outcome::FixedPoint
        };

        Simplification { node, outcome, steps: run.steps }
    }

    /// Simplifies a node. Also returns true if the whole subtree was examined and is a fixed
    /// point.
    fn simplify_node(&self, node: &Node, mut depth: usize, run: &mut Run) -> (Node, bool) {
        let mut node = node.clone();
        loop {
            if node.meta_get::<SimplifiedBy>() == Some(self.id) {
                return (node, true);
            }
            if depth == 0 {
                return (node, false);
            }

            let mut complete = true;
            let children = node.children();
            if !children.is_empty() {
                let mut changed = false;
                let mut simplified = Vec::with_capacity(children.len());
                for child in children {
                    let (new_child, child_complete) = self.simplify_node(child, depth - 1, run);
                    complete &= child_complete;
                    changed |= !new_child.ptr_eq(child);
                    simplified.push(new_child);
                }

                if changed {
                    if let Some(rebuilt) = node.with_children(simplified) {
                        node = rebuilt;
                    }
                }
            }

            match self.rewrite(&node, run) {
                Some((rewritten, rule_depth)) => {
                    node = rewritten;
                    depth = rule_depth;
                },
                None => {
                    let fixed = complete && !run.exhausted;
                    if fixed {
                        node.meta_set::<SimplifiedBy>(self.id);
                    }
                    return (node, fixed);
                },
            }
        }
    }

    /// Applies the first rule that rewrites the node, returning its output and depth.
    fn rewrite(&self, node: &Node, run: &mut Run) -> Option<(Node, usize)> {
        if run.exhausted {
            return None;
        }

        let mut output = None;
        let idx = *self.dispatcher.dispatch_until(node, |&idx| {
            output = self.rules[idx].apply(node);
            output.is_some()
        })?;
        let output = output?;
        let rule = &self.rules[idx];

        if run.steps >= self.max_steps {
            run.exhausted = true;
            return None;
        }
        run.steps += 1;

        trace!(rule = rule.description(), before = %node, after = %output, "applied rule");
        run.collector.push(Step {
            rule: Rc::clone(rule.description_rc()),
            before: node.clone(),
            after: output.clone(),
        });
        Some((output, rule.depth()))
    }
}
