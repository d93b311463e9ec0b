//! Declarative step tree of one operation.

use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::workflow::StepId;

/// What follows a step: nothing, a single continuation, or a parallel fan-out.
#[derive(Debug, Clone)]
pub enum Next<S> {
    /// Leaf.
    None,
    /// Continues the same branch.
    One(Box<StepNode<S>>),
    /// Starts one branch per child once the parent's invoke completes.
    Many(Vec<StepNode<S>>),
}

impl<S> Default for Next<S> {
    fn default() -> Self {
        Next::None
    }
}

/// A node of the step tree.
#[derive(Debug, Clone)]
pub struct StepNode<S> {
    action: S,
    save_response: bool,
    no_compensation: bool,
    next: Next<S>,
}

impl<S: StepId> StepNode<S> {
    /// Creates a leaf node that discards its result and requires compensation.
    pub fn new(action: S) -> Self {
        Self {
            action,
            save_response: false,
            no_compensation: false,
            next: Next::None,
        }
    }

    /// Keeps the invoke result for downstream steps.
    pub fn save_response(mut self) -> Self {
        self.save_response = true;
        self
    }

    /// Exempts the step from rollback.
    pub fn no_compensation(mut self) -> Self {
        self.no_compensation = true;
        self
    }

    /// Continues the branch with a single child.
    pub fn then(mut self, child: StepNode<S>) -> Self {
        self.next = Next::One(Box::new(child));
        self
    }

    /// Fans out into independent sibling branches.
    pub fn fan_out(mut self, children: impl IntoIterator<Item = StepNode<S>>) -> Self {
        let mut children: Vec<_> = children.into_iter().collect();
        self.next = match children.len() {
            0 => Next::None,
            1 => Next::One(Box::new(children.remove(0))),
            _ => Next::Many(children),
        };
        self
    }

    /// Returns the step identifier.
    pub fn action(&self) -> S {
        self.action
    }

    /// Returns true if the invoke result is kept.
    pub fn saves_response(&self) -> bool {
        self.save_response
    }

    /// Returns true unless the step is exempt from rollback.
    pub fn requires_compensation(&self) -> bool {
        !self.no_compensation
    }

    /// Returns the raw continuation.
    pub fn next(&self) -> &Next<S> {
        &self.next
    }

    /// Returns the normalized children: empty, one, or many.
    pub fn children(&self) -> &[StepNode<S>] {
        match &self.next {
            Next::None => &[],
            Next::One(child) => std::slice::from_ref(child.as_ref()),
            Next::Many(children) => children,
        }
    }

    /// Returns true if nothing follows this step.
    pub fn is_leaf(&self) -> bool {
        self.children().is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeMeta<S> {
    parent: Option<S>,
    save_response: bool,
    no_compensation: bool,
    leaf: bool,
}

/// A validated step tree with an index by step identifier.
///
/// Children are owned by their parent, so a cycle can only be written by
/// repeating an identifier; the duplicate check rejects both.
#[derive(Debug, Clone)]
pub struct StepGraph<S> {
    root: StepNode<S>,
    order: Vec<S>,
    index: HashMap<S, NodeMeta<S>>,
}

impl<S: StepId> StepGraph<S> {
    /// Validates and indexes a step tree given as the top-level continuation.
    pub fn new(next: Next<S>) -> Result<Self, DefinitionError> {
        let root = match next {
            Next::None => return Err(DefinitionError::EmptyGraph),
            Next::One(root) => *root,
            Next::Many(mut roots) => match roots.len() {
                0 => return Err(DefinitionError::EmptyGraph),
                1 => roots.remove(0),
                n => return Err(DefinitionError::MultipleRoots(n)),
            },
        };

        let mut order = Vec::new();
        let mut index = HashMap::new();
        let mut pending = vec![(&root, None)];

        // Pre-order walk: children pushed in reverse so they pop in declaration order.
        while let Some((node, parent)) = pending.pop() {
            let meta = NodeMeta {
                parent,
                save_response: node.save_response,
                no_compensation: node.no_compensation,
                leaf: node.is_leaf(),
            };
            if index.insert(node.action, meta).is_some() {
                return Err(DefinitionError::DuplicateAction(node.action.as_str()));
            }
            order.push(node.action);
            for child in node.children().iter().rev() {
                pending.push((child, Some(node.action)));
            }
        }

        Ok(Self { root, order, index })
    }

    /// Validates and indexes a tree with the given root.
    pub fn from_root(root: StepNode<S>) -> Result<Self, DefinitionError> {
        Self::new(Next::One(Box::new(root)))
    }

    /// Returns the root node.
    pub fn root(&self) -> &StepNode<S> {
        &self.root
    }

    /// Returns every step in declaration (pre-order) order.
    pub fn steps(&self) -> &[S] {
        &self.order
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false: a validated graph has a root.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if the step is part of the graph.
    pub fn contains(&self, step: S) -> bool {
        self.index.contains_key(&step)
    }

    /// Finds a node by identifier.
    pub fn node(&self, step: S) -> Option<&StepNode<S>> {
        let mut pending = vec![&self.root];
        while let Some(node) = pending.pop() {
            if node.action == step {
                return Some(node);
            }
            pending.extend(node.children());
        }
        None
    }

    /// Returns the parent of a step, or None for the root.
    pub fn parent(&self, step: S) -> Option<S> {
        self.index.get(&step).and_then(|meta| meta.parent)
    }

    /// Returns true if `ancestor` lies on the path from the root to `step`.
    pub fn is_ancestor(&self, ancestor: S, step: S) -> bool {
        let mut current = self.parent(step);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Returns true if the step keeps its invoke result.
    pub fn saves_response(&self, step: S) -> bool {
        self.index.get(&step).is_some_and(|meta| meta.save_response)
    }

    /// Returns true if the step must be undone on rollback.
    pub fn requires_compensation(&self, step: S) -> bool {
        self.index.get(&step).is_some_and(|meta| !meta.no_compensation)
    }

    /// Returns true if nothing follows the step.
    pub fn is_leaf(&self, step: S) -> bool {
        self.index.get(&step).is_some_and(|meta| meta.leaf)
    }

    /// Returns the terminal step: the last node in declaration order.
    pub fn terminal(&self) -> S {
        self.order[self.order.len() - 1]
    }
}
