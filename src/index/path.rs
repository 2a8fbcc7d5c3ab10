//! Index path grammar.
//!
//! ```text
//! /                              every set
//! /<tagType>/<tagName>           sets carrying the tag
//! /<tagType>/<tagName>/<count>   sets carrying a countable tag exactly `count` times
//! ```

use std::collections::BTreeSet;

use crate::models::Tag;

/// The root index; its count is the number of sets ever applied.
pub const ROOT: &str = "/";

/// Path of an uncounted facet.
pub fn tag_path(tag_type: &str, name: &str) -> String {
    format!("/{}/{}", tag_type, name)
}

/// Path of a counted facet.
pub fn count_path(tag_type: &str, name: &str, count: u32) -> String {
    format!("/{}/{}/{}", tag_type, name, count)
}

/// All index paths implied by a list of tags, root included.
///
/// A countable tag with count 0 produces only its `/0` path: "no X" says
/// nothing about sets that have X.
pub fn tag_paths(tags: &[Tag]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    paths.insert(ROOT.to_string());

    for tag in tags {
        match tag.count {
            Some(count) => {
                if count > 0 {
                    paths.insert(tag_path(&tag.tag_type, &tag.name));
                }
                paths.insert(count_path(&tag.tag_type, &tag.name, count));
            }
            None => {
                paths.insert(tag_path(&tag.tag_type, &tag.name));
            }
        }
    }

    paths
}

/// Number of segments below the root.
pub fn depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Count suffix of a counted path.
pub fn count_of(path: &str) -> Option<u32> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [_, _, count] => count.parse().ok(),
        _ => None,
    }
}

/// Ancestors of a path, nearest first, ending at the root.
///
/// `.../0` paths skip their uncounted parent, which never contains them.
pub fn ancestors(path: &str) -> Vec<String> {
    if path == ROOT {
        return Vec::new();
    }

    let mut chain = Vec::new();
    if count_of(path).is_some_and(|c| c > 0) {
        if let Some(idx) = path.rfind('/') {
            chain.push(path[..idx].to_string());
        }
    }
    chain.push(ROOT.to_string());
    chain
}
