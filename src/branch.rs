//! Branch listing entries, menu rendering and operator selection.
//!
//! Everything here is pure: the git plumbing lives in [`crate::git`] and the
//! prompt in [`crate::prompt`].

use crate::error::SelectionError;

const REMOTES_PREFIX: &str = "refs/remotes/";
const HEADS_PREFIX: &str = "refs/heads/";
const SYMBOLIC_HEAD: &str = "HEAD";

/// Where a listed branch reference lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOrigin {
    Remote { remote: String },
    Local,
}

/// One line of the branch menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    /// e.g. `origin/main` or `main`.
    pub reference_name: String,
    /// e.g. `2 days ago`.
    pub relative_update_time: String,
    pub origin: BranchOrigin,
}

impl BranchEntry {
    pub fn remote(reference_name: &str, relative_update_time: &str) -> Self {
        let remote = reference_name
            .split_once('/')
            .map_or(reference_name, |(remote, _)| remote)
            .to_string();
        Self {
            reference_name: reference_name.to_string(),
            relative_update_time: relative_update_time.to_string(),
            origin: BranchOrigin::Remote { remote },
        }
    }

    pub fn local(reference_name: &str, relative_update_time: &str) -> Self {
        Self {
            reference_name: reference_name.to_string(),
            relative_update_time: relative_update_time.to_string(),
            origin: BranchOrigin::Local,
        }
    }
}

/// Parses one `%(refname)\t%(committerdate:relative)` line.
///
/// Returns `None` for blank lines, unknown namespaces and symbolic
/// `<remote>/HEAD` refs.
pub fn parse_listing_line(line: &str) -> Option<BranchEntry> {
    let (full_ref, when) = line.split_once('\t')?;
    let when = when.trim();

    if let Some(short) = full_ref.strip_prefix(REMOTES_PREFIX) {
        let (_, branch) = short.split_once('/')?;
        if branch == SYMBOLIC_HEAD {
            return None;
        }
        Some(BranchEntry::remote(short, when))
    } else {
        let short = full_ref.strip_prefix(HEADS_PREFIX)?;
        if short.is_empty() {
            return None;
        }
        Some(BranchEntry::local(short, when))
    }
}

/// Strips everything up to and including the first `/`.
///
/// `origin/feature-x` becomes `feature-x`; `main` is returned unchanged.
pub fn local_branch_name(reference: &str) -> &str {
    reference
        .split_once('/')
        .map_or(reference, |(_, rest)| rest)
}

/// Zero-based menu lines in the order given.
pub fn menu_lines(entries: &[BranchEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "[{}] {} ({})",
                index, entry.reference_name, entry.relative_update_time
            )
        })
        .collect()
}

/// Validates raw operator input against a menu of `count` entries.
pub fn parse_selection(input: &str, count: usize) -> Result<usize, SelectionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SelectionError::Empty);
    }

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some(magnitude) = trimmed.strip_prefix('-') {
        if is_digits(magnitude) {
            return Err(SelectionError::Negative(trimmed.to_string()));
        }
        return Err(SelectionError::NotANumber(trimmed.to_string()));
    }

    if !is_digits(trimmed) {
        return Err(SelectionError::NotANumber(trimmed.to_string()));
    }

    // All digits: parse can only fail on overflow, which is out of range anyway.
    let index = trimmed.parse::<usize>().unwrap_or(usize::MAX);
    if index >= count {
        return Err(SelectionError::OutOfRange { index, count });
    }
    Ok(index)
}

/// A validated choice from the branch menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub chosen_index: usize,
    pub resolved_reference: String,
    pub local_branch_name: String,
    pub origin: BranchOrigin,
}

impl Selection {
    pub fn from_entries(entries: &[BranchEntry], index: usize) -> Result<Self, SelectionError> {
        let entry = entries.get(index).ok_or(SelectionError::OutOfRange {
            index,
            count: entries.len(),
        })?;

        let local_branch_name = match entry.origin {
            BranchOrigin::Remote { .. } => local_branch_name(&entry.reference_name),
            BranchOrigin::Local => entry.reference_name.as_str(),
        }
        .to_string();

        Ok(Self {
            chosen_index: index,
            resolved_reference: entry.reference_name.clone(),
            local_branch_name,
            origin: entry.origin.clone(),
        })
    }

    /// Remote name and branch to pull, if the selection came from a remote.
    pub fn upstream(&self) -> Option<(&str, &str)> {
        match &self.origin {
            BranchOrigin::Remote { remote } => {
                Some((remote.as_str(), self.local_branch_name.as_str()))
            }
            BranchOrigin::Local => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_remote_entries() -> Vec<BranchEntry> {
        vec![
            BranchEntry::remote("origin/dev", "1 hour ago"),
            BranchEntry::remote("origin/main", "2 days ago"),
        ]
    }

    #[test]
    fn test_parse_listing_line_remote_branch() {
        let entry = parse_listing_line("refs/remotes/origin/dev\t1 hour ago").unwrap();
        assert_eq!(entry.reference_name, "origin/dev");
        assert_eq!(entry.relative_update_time, "1 hour ago");
        assert_eq!(
            entry.origin,
            BranchOrigin::Remote {
                remote: "origin".to_string()
            }
        );
    }

    #[test]
    fn test_parse_listing_line_keeps_nested_remote_branch_names() {
        let entry = parse_listing_line("refs/remotes/origin/feature/login\t3 weeks ago").unwrap();
        assert_eq!(entry.reference_name, "origin/feature/login");
    }

    #[test]
    fn test_parse_listing_line_local_branch() {
        let entry = parse_listing_line("refs/heads/feature/x\t5 minutes ago").unwrap();
        assert_eq!(entry.reference_name, "feature/x");
        assert_eq!(entry.origin, BranchOrigin::Local);
    }

    #[test]
    fn test_parse_listing_line_skips_symbolic_head_and_garbage() {
        assert!(parse_listing_line("refs/remotes/origin/HEAD\t2 days ago").is_none());
        assert!(parse_listing_line("").is_none());
        assert!(parse_listing_line("refs/tags/v1\t1 day ago").is_none());
        assert!(parse_listing_line("no tab here").is_none());
    }

    #[test]
    fn test_local_branch_name_strips_exactly_one_segment() {
        assert_eq!(local_branch_name("origin/feature-x"), "feature-x");
        assert_eq!(local_branch_name("main"), "main");
        assert_eq!(local_branch_name("origin/feature/login"), "feature/login");
    }

    #[test]
    fn test_menu_lines_preserve_input_order() {
        let entries = vec![
            BranchEntry::remote("origin/zeta", "1 minute ago"),
            BranchEntry::remote("origin/alpha", "1 year ago"),
            BranchEntry::remote("origin/mid", "1 month ago"),
        ];
        assert_eq!(
            menu_lines(&entries),
            vec![
                "[0] origin/zeta (1 minute ago)",
                "[1] origin/alpha (1 year ago)",
                "[2] origin/mid (1 month ago)",
            ]
        );
    }

    #[test]
    fn test_parse_selection_accepts_valid_indices() {
        assert_eq!(parse_selection("0", 2), Ok(0));
        assert_eq!(parse_selection("1\n", 2), Ok(1));
        assert_eq!(parse_selection("  1  ", 2), Ok(1));
    }

    #[test]
    fn test_parse_selection_rejection_reasons() {
        assert_eq!(parse_selection("", 2), Err(SelectionError::Empty));
        assert_eq!(parse_selection("   \n", 2), Err(SelectionError::Empty));
        assert_eq!(
            parse_selection("abc", 2),
            Err(SelectionError::NotANumber("abc".to_string()))
        );
        assert_eq!(
            parse_selection("1.5", 2),
            Err(SelectionError::NotANumber("1.5".to_string()))
        );
        assert_eq!(
            parse_selection("+1", 2),
            Err(SelectionError::NotANumber("+1".to_string()))
        );
        assert_eq!(
            parse_selection("-1", 2),
            Err(SelectionError::Negative("-1".to_string()))
        );
        assert_eq!(
            parse_selection("-x", 2),
            Err(SelectionError::NotANumber("-x".to_string()))
        );
        assert_eq!(
            parse_selection("5", 2),
            Err(SelectionError::OutOfRange { index: 5, count: 2 })
        );
        assert_eq!(
            parse_selection("2", 2),
            Err(SelectionError::OutOfRange { index: 2, count: 2 })
        );
        assert!(matches!(
            parse_selection("99999999999999999999999", 2),
            Err(SelectionError::OutOfRange { count: 2, .. })
        ));
    }

    #[test]
    fn test_selection_from_remote_entry_derives_local_name_and_upstream() {
        let selection = Selection::from_entries(&two_remote_entries(), 0).unwrap();
        assert_eq!(selection.chosen_index, 0);
        assert_eq!(selection.resolved_reference, "origin/dev");
        assert_eq!(selection.local_branch_name, "dev");
        assert_eq!(selection.upstream(), Some(("origin", "dev")));
    }

    #[test]
    fn test_selection_from_local_entry_keeps_full_name() {
        let entries = vec![BranchEntry::local("feature/x", "1 day ago")];
        let selection = Selection::from_entries(&entries, 0).unwrap();
        assert_eq!(selection.local_branch_name, "feature/x");
        assert_eq!(selection.upstream(), None);
    }

    #[test]
    fn test_selection_from_entries_rejects_out_of_bounds() {
        assert_eq!(
            Selection::from_entries(&two_remote_entries(), 2),
            Err(SelectionError::OutOfRange { index: 2, count: 2 })
        );
    }
}
