use std::collections::HashMap;

use crate::api::{Comment, CommentPath};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommentNode {
    pub comment: Comment,
    pub depth: usize,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    pub fn path(&self) -> &CommentPath {
        &self.comment.path
    }

    /// Sibling count a new reply to this comment gets its index from
    pub fn reply_count(&self) -> usize {
        self.children.len()
    }
}

/// Nests a flat listing by path.
///
/// Siblings keep their input order. A comment whose parent path is not in
/// the listing is dropped together with its own replies. Tombstones are
/// regular nodes, so replies to a deleted comment stay attached.
pub fn build_comment_tree(flat: &[Comment]) -> Vec<CommentNode> {
    // A repeated path resolves to its last occurrence everywhere
    let by_path: HashMap<&str, usize> = flat
        .iter()
        .enumerate()
        .map(|(i, c)| (c.path.as_str(), i))
        .collect();

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
    for c in flat {
        let current = by_path[c.path.as_str()];
        match c.path.parent() {
            None => roots.push(current),
            Some(parent) => match by_path.get(parent.as_str()) {
                Some(&p) => children[p].push(current),
                None => tracing::debug!(path = %c.path, "dropping orphan comment"),
            },
        }
    }

    fn assemble(flat: &[Comment], children: &[Vec<usize>], i: usize) -> CommentNode {
        CommentNode {
            comment: flat[i].clone(),
            depth: flat[i].path.depth(),
            children: children[i]
                .iter()
                .map(|&c| assemble(flat, children, c))
                .collect(),
        }
    }

    roots
        .into_iter()
        .map(|r| assemble(flat, &children, r))
        .collect()
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentTree {
    pub roots: Vec<CommentNode>,
    /// Length of the flat listing, orphans and tombstones included
    pub total_count: usize,
}

impl CommentTree {
    pub fn build(flat: &[Comment]) -> CommentTree {
        CommentTree {
            roots: build_comment_tree(flat),
            total_count: flat.len(),
        }
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn find(&self, path: &CommentPath) -> Option<&CommentNode> {
        let mut level = &self.roots;
        let mut prefix: Option<CommentPath> = None;
        for seg in path.segments() {
            let wanted = match &prefix {
                None => String::from(seg),
                Some(p) => format!("{p}.{seg}"),
            };
            let node = level.iter().find(|n| n.path().as_str() == wanted)?;
            if node.path() == path {
                return Some(node);
            }
            prefix = Some(node.path().clone());
            level = &node.children;
        }
        None
    }

    /// Sibling count for a new comment under `parent`, or at the root level
    pub fn sibling_count(&self, parent: Option<&CommentPath>) -> Option<usize> {
        match parent {
            None => Some(self.root_count()),
            Some(p) => self.find(p).map(|n| n.reply_count()),
        }
    }

    /// Depth-first, parents before their replies
    pub fn walk(&self) -> Vec<&CommentNode> {
        fn visit<'a>(nodes: &'a [CommentNode], out: &mut Vec<&'a CommentNode>) {
            for n in nodes {
                out.push(n);
                visit(&n.children, out);
            }
        }
        let mut out = Vec::with_capacity(self.total_count);
        visit(&self.roots, &mut out);
        out
    }
}
