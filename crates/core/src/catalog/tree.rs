use std::cmp::Ordering;

use crate::domain::category::Category;
use crate::errors::DomainError;

pub(crate) type Link = Option<Box<Node>>;

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) category: Category,
    pub(crate) height: usize,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

impl Node {
    fn new(category: Category) -> Box<Self> {
        Box::new(Self { category, height: 1, left: None, right: None })
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    /// Left subtree height minus right subtree height, from cached heights.
    pub(crate) fn balance_factor(&self) -> isize {
        height(&self.left) as isize - height(&self.right) as isize
    }
}

fn height(link: &Link) -> usize {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance_of(link: &Link) -> isize {
    link.as_ref().map_or(0, |node| node.balance_factor())
}

/// Promotes the left child. Heights are recomputed bottom-up: the demoted
/// node first, then the promoted one that now sits above it.
fn rotate_right(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update_height();
    pivot.right = Some(node);
    pivot.update_height();
    pivot
}

fn rotate_left(mut node: Box<Node>) -> Box<Node> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update_height();
    pivot.left = Some(node);
    pivot.update_height();
    pivot
}

/// Insert-side rebalancing. The case is chosen by comparing the inserted key
/// with the key of the heavy child.
fn rebalance_inserted(mut node: Box<Node>, key: &str) -> Box<Node> {
    let balance = node.balance_factor();

    if balance > 1 {
        let left_left = node.left.as_ref().is_some_and(|left| key < left.category.name());
        if !left_left {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if balance < -1 {
        let right_right = node.right.as_ref().is_some_and(|right| key > right.category.name());
        if !right_right {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

/// Removal-side rebalancing, driven by the heavy child's balance factor since
/// the removed key says nothing about where the tree became lopsided.
fn rebalance(mut node: Box<Node>) -> Box<Node> {
    node.update_height();
    let balance = node.balance_factor();

    if balance > 1 {
        if balance_of(&node.left) < 0 {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }

    if balance < -1 {
        if balance_of(&node.right) > 0 {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }

    node
}

/// AVL tree of top-level categories keyed by name.
///
/// `revision` moves forward on every structural change and on every mutable
/// borrow of a category, so derived structures can tell when they were built
/// from an older state.
#[derive(Clone, Debug, Default)]
pub struct CatalogTree {
    root: Link,
    len: usize,
    revision: u64,
}

impl CatalogTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Height of the root as tracked by the tree itself.
    pub fn height(&self) -> usize {
        height(&self.root)
    }

    pub fn root_category(&self) -> Option<&Category> {
        self.root.as_ref().map(|node| &node.category)
    }

    pub(crate) fn root_node(&self) -> Option<&Node> {
        self.root.as_deref()
    }

    /// Inserts by name. A category whose name is already present is dropped and
    /// the stored one is left untouched.
    pub fn insert(&mut self, category: Category) {
        let key = category.name().to_owned();
        let mut inserted = false;
        self.root = Some(Self::insert_node(self.root.take(), category, &key, &mut inserted));
        if inserted {
            self.len += 1;
            self.revision += 1;
        }
    }

    fn insert_node(link: Link, category: Category, key: &str, inserted: &mut bool) -> Box<Node> {
        let Some(mut node) = link else {
            *inserted = true;
            return Node::new(category);
        };

        match key.cmp(node.category.name()) {
            Ordering::Less => {
                node.left = Some(Self::insert_node(node.left.take(), category, key, inserted));
            }
            Ordering::Greater => {
                node.right = Some(Self::insert_node(node.right.take(), category, key, inserted));
            }
            Ordering::Equal => return node,
        }

        node.update_height();
        rebalance_inserted(node, key)
    }

    pub fn search(&self, name: &str) -> Option<&Category> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match name.cmp(node.category.name()) {
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
                Ordering::Equal => return Some(&node.category),
            }
        }
        None
    }

    /// Mutable lookup. Any successful borrow counts as a change for staleness
    /// tracking, whether or not the caller ends up writing.
    pub fn search_mut(&mut self, name: &str) -> Option<&mut Category> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match name.cmp(node.category.name()) {
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
                Ordering::Equal => {
                    self.revision += 1;
                    return Some(&mut node.category);
                }
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.search(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.take(name).is_some()
    }

    /// Detaches the named category and hands it back.
    pub fn take(&mut self, name: &str) -> Option<Category> {
        let mut removed = None;
        self.root = Self::remove_node(self.root.take(), name, &mut removed);
        if removed.is_some() {
            self.len -= 1;
            self.revision += 1;
        }
        removed
    }

    fn remove_node(link: Link, name: &str, removed: &mut Option<Category>) -> Link {
        let mut node = link?;

        match name.cmp(node.category.name()) {
            Ordering::Less => node.left = Self::remove_node(node.left.take(), name, removed),
            Ordering::Greater => node.right = Self::remove_node(node.right.take(), name, removed),
            Ordering::Equal => {
                let Node { category, left, right, .. } = *node;
                *removed = Some(category);
                match (left, right) {
                    (None, right) => return right,
                    (left, None) => return left,
                    (Some(left), Some(right)) => {
                        // The in-order successor takes over this slot and its
                        // original node leaves the right subtree.
                        let (successor, right) = Self::detach_min(right);
                        node = Box::new(Node {
                            category: successor,
                            height: 1,
                            left: Some(left),
                            right,
                        });
                    }
                }
            }
        }

        Some(rebalance(node))
    }

    fn detach_min(mut node: Box<Node>) -> (Category, Link) {
        match node.left.take() {
            None => {
                let Node { category, right, .. } = *node;
                (category, right)
            }
            Some(left) => {
                let (minimum, rest) = Self::detach_min(left);
                node.left = rest;
                (minimum, Some(rebalance(node)))
            }
        }
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
        self.revision += 1;
    }

    /// `(name, subtree height)` in ascending name order.
    pub fn in_order(&self) -> Vec<(&str, usize)> {
        let mut visited = Vec::with_capacity(self.len);
        visit_in_order(&self.root, &mut |node| {
            visited.push((node.category.name(), node.height));
        });
        visited
    }

    /// `(name, subtree height)` with each node before its subtrees.
    pub fn pre_order(&self) -> Vec<(&str, usize)> {
        let mut visited = Vec::with_capacity(self.len);
        visit_pre_order(&self.root, &mut |node| {
            visited.push((node.category.name(), node.height));
        });
        visited
    }

    /// Every category, sorted by name.
    pub fn list_all(&self) -> Vec<&Category> {
        let mut categories = Vec::with_capacity(self.len);
        visit_in_order(&self.root, &mut |node| categories.push(&node.category));
        categories
    }

    /// Height obtained by walking every node, ignoring cached heights.
    pub fn measured_height(&self) -> usize {
        fn measure(link: &Link) -> usize {
            link.as_ref().map_or(0, |node| 1 + measure(&node.left).max(measure(&node.right)))
        }
        measure(&self.root)
    }

    /// Recomputes subtree heights from scratch and checks that no node leans
    /// more than one level to either side.
    pub fn is_balanced(&self) -> bool {
        fn check(link: &Link) -> Option<usize> {
            let Some(node) = link else {
                return Some(0);
            };
            let left = check(&node.left)?;
            let right = check(&node.right)?;
            (left.abs_diff(right) <= 1).then_some(1 + left.max(right))
        }
        check(&self.root).is_some()
    }

    /// Full structural audit: strict name ordering, cached heights, balance
    /// factors and the recorded size.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut counted = 0;
        validate_node(&self.root, None, None, &mut counted)?;
        if counted != self.len {
            return Err(DomainError::InvariantViolation(format!(
                "tree records {} categories but {counted} are reachable",
                self.len
            )));
        }
        Ok(())
    }
}

fn visit_in_order<'a>(link: &'a Link, visit: &mut impl FnMut(&'a Node)) {
    if let Some(node) = link {
        visit_in_order(&node.left, visit);
        visit(node);
        visit_in_order(&node.right, visit);
    }
}

fn visit_pre_order<'a>(link: &'a Link, visit: &mut impl FnMut(&'a Node)) {
    if let Some(node) = link {
        visit(node);
        visit_pre_order(&node.left, visit);
        visit_pre_order(&node.right, visit);
    }
}

fn validate_node<'a>(
    link: &'a Link,
    lower: Option<&'a str>,
    upper: Option<&'a str>,
    counted: &mut usize,
) -> Result<usize, DomainError> {
    let Some(node) = link else {
        return Ok(0);
    };
    let name = node.category.name();

    if lower.is_some_and(|bound| name <= bound) || upper.is_some_and(|bound| name >= bound) {
        return Err(DomainError::InvariantViolation(format!(
            "category `{name}` is out of order (bounds {lower:?}..{upper:?})"
        )));
    }

    let left = validate_node(&node.left, lower, Some(name), counted)?;
    let right = validate_node(&node.right, Some(name), upper, counted)?;
    *counted += 1;

    let actual = 1 + left.max(right);
    if node.height != actual {
        return Err(DomainError::InvariantViolation(format!(
            "category `{name}` caches height {} but measures {actual}",
            node.height
        )));
    }
    if left.abs_diff(right) > 1 {
        return Err(DomainError::InvariantViolation(format!(
            "category `{name}` has balance factor {}",
            left as isize - right as isize
        )));
    }

    Ok(actual)
}
