//! Lexical path helpers for sandbox containment.

use std::path::{Component, Path, PathBuf};

/// Join `relative` onto `base` and fold `.` / `..` components without
/// touching the filesystem.
///
/// `..` never climbs above the filesystem root. An absolute `relative`
/// replaces `base`, exactly as [`Path::join`] does, so the containment check
/// sees where the caller actually pointed.
pub fn lexical_join(base: &Path, relative: &Path) -> PathBuf {
    let joined = base.join(relative);
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Whether `candidate` is `root` or a descendant of it.
///
/// Comparison is component-wise, so `/srv/root2` is not inside `/srv/root`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_join_folds_dot_segments() {
        let out = lexical_join(Path::new("/srv/root"), Path::new("./pkg/../main.py"));
        assert_eq!(out, PathBuf::from("/srv/root/main.py"));
    }

    #[test]
    fn lexical_join_of_empty_is_base() {
        assert_eq!(
            lexical_join(Path::new("/srv/root"), Path::new("")),
            PathBuf::from("/srv/root")
        );
        assert_eq!(
            lexical_join(Path::new("/srv/root"), Path::new(".")),
            PathBuf::from("/srv/root")
        );
    }

    #[test]
    fn lexical_join_does_not_climb_above_filesystem_root() {
        let out = lexical_join(Path::new("/srv"), Path::new("../../../etc"));
        assert_eq!(out, PathBuf::from("/etc"));
    }

    #[test]
    fn sibling_with_shared_prefix_is_not_within() {
        assert!(!is_within(Path::new("/srv/root"), Path::new("/srv/root2/a")));
        assert!(is_within(Path::new("/srv/root"), Path::new("/srv/root/a")));
        assert!(is_within(Path::new("/srv/root"), Path::new("/srv/root")));
    }
}
