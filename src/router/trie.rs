//! Segment trie holding the registered routes.
//!
//! Literal segments get one child each; every `{{name}}` segment at a given
//! depth shares the single wildcard child, so the trie never knows wildcard
//! names. They are recovered later from the terminal node's template.

use std::collections::HashMap;
use std::sync::Arc;

use super::RouterError;
use crate::controller::Controller;

/// Prefix marking a template placeholder segment.
pub const PLACEHOLDER_OPEN: &str = "{{";
/// Suffix closing a template placeholder segment.
pub const PLACEHOLDER_CLOSE: &str = "}}";

/// Label used for the wildcard slot when describing a node.
const WILDCARD: &str = "*";

/// A controller bound to the route template that terminates at a node.
#[derive(Clone)]
pub struct Route {
    template: String,
    controller: Arc<dyn Controller>,
}

impl Route {
    pub(crate) fn new(template: impl Into<String>, controller: Arc<dyn Controller>) -> Self {
        Self {
            template: template.into(),
            controller,
        }
    }

    /// The route template exactly as it was registered.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// One node of the trie.
#[derive(Debug)]
pub struct RouteNode {
    segment: String,
    literals: HashMap<String, RouteNode>,
    wildcard: Option<Box<RouteNode>>,
    route: Option<Route>,
}

fn is_placeholder(segment: &str) -> bool {
    segment.starts_with(PLACEHOLDER_OPEN)
}

impl RouteNode {
    pub(crate) fn new(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            literals: HashMap::new(),
            wildcard: None,
            route: None,
        }
    }

    /// The literal token this node matches, or `*` for the wildcard slot.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// The binding, present only on terminal nodes.
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.route.is_some()
    }

    pub fn literal_child(&self, segment: &str) -> Option<&RouteNode> {
        self.literals.get(segment)
    }

    pub fn wildcard_child(&self) -> Option<&RouteNode> {
        self.wildcard.as_deref()
    }

    /// Number of direct children, wildcard slot included.
    pub fn child_count(&self) -> usize {
        self.literals.len() + usize::from(self.wildcard.is_some())
    }

    pub(crate) fn bind(&mut self, route: Route) {
        self.route = Some(route);
    }

    /// Binds `controller` at the node reached by `segments`.
    ///
    /// Missing intermediate nodes are created. If the final node is already
    /// bound, nothing is rebound and [`RouterError::Conflict`] names the
    /// template already there.
    pub fn insert(
        &mut self,
        segments: &[&str],
        template: &str,
        controller: Arc<dyn Controller>,
    ) -> Result<(), RouterError> {
        let mut node = self;
        for segment in segments {
            node = if is_placeholder(segment) {
                node.wildcard
                    .get_or_insert_with(|| Box::new(RouteNode::new(WILDCARD)))
                    .as_mut()
            } else {
                node.literals
                    .entry((*segment).to_owned())
                    .or_insert_with(|| RouteNode::new(*segment))
            };
        }

        if let Some(existing) = &node.route {
            return Err(RouterError::Conflict {
                route: template.to_owned(),
                existing: existing.template.clone(),
            });
        }
        node.bind(Route::new(template, controller));
        Ok(())
    }

    /// Walks `segments` from this node.
    ///
    /// At every depth an exact literal child wins; the wildcard child is
    /// tried only when no literal child exists. There is no backtracking: a
    /// literal child whose subtree fails does not fall back to the wildcard.
    /// An empty segment has no literal child, so it matches the wildcard.
    /// The returned node may be unbound; callers decide what a non-terminal
    /// result means.
    pub fn find(&self, segments: &[&str]) -> Option<&RouteNode> {
        let mut node = self;
        for segment in segments {
            node = match node.literals.get(*segment) {
                Some(child) => child,
                None => node.wildcard.as_deref()?,
            };
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    struct Named(&'static str);

    impl Controller for Named {
        fn authenticate(&self, _ctx: &Context) -> bool {
            true
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn named(id: &'static str) -> Arc<dyn Controller> {
        Arc::new(Named(id))
    }

    fn bound_template<'a>(root: &'a RouteNode, path: &[&str]) -> Option<&'a str> {
        root.find(path)?.route().map(Route::template)
    }

    #[test]
    fn insert_creates_one_node_per_segment() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "b", "c"], "a/b/c", named("x")).unwrap();

        let a = root.literal_child("a").unwrap();
        let b = a.literal_child("b").unwrap();
        let c = b.literal_child("c").unwrap();
        assert!(!a.is_terminal());
        assert!(!b.is_terminal());
        assert_eq!(c.route().unwrap().template(), "a/b/c");
        assert_eq!(c.segment(), "c");
    }

    #[test]
    fn placeholders_share_the_wildcard_slot() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "{{x}}", "c"], "a/{{x}}/c", named("x")).unwrap();
        root.insert(&["a", "{{y}}", "d"], "a/{{y}}/d", named("y")).unwrap();

        let a = root.literal_child("a").unwrap();
        assert_eq!(a.child_count(), 1);
        let w = a.wildcard_child().unwrap();
        assert_eq!(w.segment(), "*");
        assert_eq!(w.child_count(), 2);
    }

    #[test]
    fn conflict_keeps_original_binding() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "{{x}}"], "a/{{x}}", named("first")).unwrap();

        let err = root
            .insert(&["a", "{{y}}"], "a/{{y}}", named("second"))
            .unwrap_err();
        assert!(matches!(
            &err,
            RouterError::Conflict { route, existing } if route == "a/{{y}}" && existing == "a/{{x}}"
        ));
        assert_eq!(bound_template(&root, &["a", "7"]), Some("a/{{x}}"));
        let bound = root.find(&["a", "7"]).and_then(RouteNode::route).unwrap();
        assert_eq!(bound.controller().name(), "first");
    }

    #[test]
    fn literal_beats_wildcard_per_position() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "b", "c"], "a/b/c", named("x")).unwrap();
        root.insert(&["a", "{{w}}", "c"], "a/{{w}}/c", named("y")).unwrap();

        assert_eq!(bound_template(&root, &["a", "b", "c"]), Some("a/b/c"));
        assert_eq!(bound_template(&root, &["a", "z", "c"]), Some("a/{{w}}/c"));
    }

    #[test]
    fn no_backtracking_into_wildcard() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "b", "c"], "a/b/c", named("x")).unwrap();
        root.insert(&["a", "{{w}}", "d"], "a/{{w}}/d", named("y")).unwrap();

        assert!(root.find(&["a", "b", "d"]).is_none());
    }

    #[test]
    fn partial_paths_reach_unbound_nodes() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "b"], "a/b", named("x")).unwrap();

        let node = root.find(&["a"]).unwrap();
        assert!(!node.is_terminal());
        assert!(root.find(&["a", "b", "c"]).is_none());
    }

    #[test]
    fn empty_segment_matches_wildcard() {
        let mut root = RouteNode::new("/");
        root.insert(&["a", "{{x}}", "c"], "a/{{x}}/c", named("x")).unwrap();
        assert_eq!(bound_template(&root, &["a", "", "c"]), Some("a/{{x}}/c"));
        assert!(root.find(&["b", ""]).is_none());
    }

    #[test]
    fn empty_path_is_the_node_itself() {
        let root = RouteNode::new("/");
        let found = root.find(&[]).unwrap();
        assert_eq!(found.segment(), "/");
        assert!(!found.is_terminal());
    }
}
