//! Radix tree node implementation.

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::params::Params;
use flongo_core::HttpMethod;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "api")
    Static,
    /// Named parameter (e.g., "{id}", "<id>", "<int:id>")
    Param(String),
    /// Catch-all wildcard (e.g., "*path", "<path:path>")
    Wildcard(String),
}

/// A node in the radix tree.
///
/// Nodes at route boundaries carry a [`MethodRouter`] with the values bound
/// to that path.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The path segment this node represents
    pub segment: String,
    /// The kind of segment (static, param, or wildcard)
    pub kind: SegmentKind,
    /// Method slots for this node (if it's a route endpoint)
    pub methods: Option<MethodRouter<T>>,
    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node<T>>,
    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node<T>>>,
    /// Wildcard child (at most one per node, always a leaf)
    pub wildcard_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Binds `value` to `(path, method)`.
    pub fn insert(&mut self, path: &str, method: HttpMethod, value: T) -> Result<(), RouteError> {
        let segments = parse_path(path);
        self.insert_segments(path, &segments, method, value)
    }

    fn insert_segments(
        &mut self,
        path: &str,
        segments: &[(String, SegmentKind)],
        method: HttpMethod,
        value: T,
    ) -> Result<(), RouteError> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            return self
                .methods
                .get_or_insert_with(MethodRouter::new)
                .insert(method, value)
                .map_err(|_| RouteError::Duplicate {
                    path: path.to_string(),
                    method,
                });
        };

        match kind {
            SegmentKind::Static => {
                let index = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(index) => index,
                    Err(index) => {
                        self.static_children
                            .insert(index, Self::with_kind(segment.clone(), kind.clone()));
                        index
                    }
                };
                self.static_children[index].insert_segments(path, remaining, method, value)
            }
            SegmentKind::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Self::with_kind(segment.clone(), kind.clone())));
                check_name(path, &child.kind, name)?;
                child.insert_segments(path, remaining, method, value)
            }
            SegmentKind::Wildcard(name) => {
                if !remaining.is_empty() {
                    return Err(RouteError::WildcardNotLast {
                        path: path.to_string(),
                    });
                }
                let child = self
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(Self::with_kind(segment.clone(), kind.clone())));
                check_name(path, &child.kind, name)?;
                child.insert_segments(path, remaining, method, value)
            }
        }
    }

    /// Matches a path against the tree.
    ///
    /// Returns the method slots and extracted parameters if found.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params)?;
        Some((methods, params))
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
    ) -> Option<&'a MethodRouter<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        // Static beats parameter beats wildcard.
        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), (*segment).to_string());
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                params.push(name.clone(), segments.join("/"));
                return child.methods.as_ref();
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

fn check_name(path: &str, existing: &SegmentKind, name: &str) -> Result<(), RouteError> {
    match existing {
        SegmentKind::Param(current) | SegmentKind::Wildcard(current) if current != name => {
            Err(RouteError::ParamConflict {
                path: path.to_string(),
                existing: current.clone(),
                new: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Splits a path pattern into typed segments.
fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| (s.to_string(), segment_kind(s)))
        .collect()
}

fn segment_kind(segment: &str) -> SegmentKind {
    if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return SegmentKind::Param(name.to_string());
    }
    if let Some(name) = segment.strip_prefix('*') {
        return SegmentKind::Wildcard(name.to_string());
    }
    if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return match inner.split_once(':') {
            Some(("path", name)) => SegmentKind::Wildcard(name.to_string()),
            Some((_, name)) => SegmentKind::Param(name.to_string()),
            None => SegmentKind::Param(inner.to_string()),
        };
    }
    SegmentKind::Static
}
