//! Path helpers shared by stores and the decorator.
//!
//! No normalization beyond separator handling; `..` and `.` are passed through.

/// Split a path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Every ancestor-or-self prefix of `path`, shortest first.
///
/// `"a/b/c"` yields `["a", "a/b", "a/b/c"]`. A leading `/` is kept on every
/// prefix; repeated and trailing separators are dropped.
pub fn prefixes(path: &str) -> Vec<String> {
    let lead = if path.starts_with('/') { "/" } else { "" };
    let mut out = Vec::new();
    let mut acc = String::from(lead);
    for part in components(path) {
        if acc.len() > lead.len() {
            acc.push('/');
        }
        acc.push_str(part);
        out.push(acc.clone());
    }
    out
}

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// True for `""`, `"/"`, `"//"` and friends.
pub fn is_root(path: &str) -> bool {
    components(path).next().is_none()
}
