// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Merger-commit grouping.

use super::model::{Commit, CommitStatus, MergerCommitGroup};

/// Fold a branch's commits (oldest first) into merger groups.
///
/// Each merger commit closes the ordinary commits accumulated since the
/// previous one. Commits after the last merger commit form a final group
/// without a merger. No empty trailing group is produced.
pub fn group_commits(commits: impl IntoIterator<Item = Commit>) -> Vec<MergerCommitGroup> {
    let mut groups = Vec::new();
    let mut pending = Vec::new();

    for commit in commits {
        if commit.status == CommitStatus::MergerCommit {
            groups.push(MergerCommitGroup {
                merger_commit: Some(commit),
                commits: std::mem::take(&mut pending),
            });
        } else {
            pending.push(commit);
        }
    }

    if !pending.is_empty() {
        groups.push(MergerCommitGroup {
            merger_commit: None,
            commits: pending,
        });
    }
    groups
}

/// `PENDING` commits made after the latest merger commit.
pub fn pending_since_last_merge(commits: &[Commit]) -> Vec<Commit> {
    let start = commits
        .iter()
        .rposition(|c| c.status == CommitStatus::MergerCommit)
        .map_or(0, |i| i + 1);
    commits[start..]
        .iter()
        .filter(|c| c.status == CommitStatus::Pending)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BlobRecord;
    use crate::versioning::model::{CommittedBy, GENESIS_COMMIT};
    use chrono::Utc;

    fn commit(hash: &str, status: CommitStatus) -> Commit {
        let now = Utc::now();
        Commit {
            commit_hash: hash.to_string(),
            branch_hash: "b".into(),
            repo_hash: "r".into(),
            sequence: 0,
            committer: "w".into(),
            committed_by: CommittedBy::User,
            message: hash.to_string(),
            status,
            params: BlobRecord {
                cid: hash.to_string(),
                uri: String::new(),
                extension: "pt".into(),
                size: 0,
                created_at: now,
            },
            previous_commit_hash: GENESIS_COMMIT.into(),
            metrics: None,
            zkml_proof: None,
            nft: None,
            rejection_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn hashes(commits: &[Commit]) -> Vec<&str> {
        commits.iter().map(|c| c.commit_hash.as_str()).collect()
    }

    #[test]
    fn merger_commits_close_preceding_runs() {
        let groups = group_commits(vec![
            commit("C1", CommitStatus::Merged),
            commit("C2", CommitStatus::Rejected),
            commit("M1", CommitStatus::MergerCommit),
            commit("C3", CommitStatus::Merged),
            commit("M2", CommitStatus::MergerCommit),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].merger_commit.as_ref().unwrap().commit_hash, "M1");
        assert_eq!(hashes(&groups[0].commits), vec!["C1", "C2"]);
        assert_eq!(groups[1].merger_commit.as_ref().unwrap().commit_hash, "M2");
        assert_eq!(hashes(&groups[1].commits), vec!["C3"]);
    }

    #[test]
    fn trailing_commits_form_open_group() {
        let groups = group_commits(vec![
            commit("M1", CommitStatus::MergerCommit),
            commit("C1", CommitStatus::Pending),
        ]);

        assert_eq!(groups.len(), 2);
        assert!(groups[0].commits.is_empty());
        assert!(groups[1].merger_commit.is_none());
        assert_eq!(hashes(&groups[1].commits), vec!["C1"]);
    }

    #[test]
    fn empty_branch_has_no_groups() {
        assert!(group_commits(Vec::new()).is_empty());
    }

    #[test]
    fn pending_only_counts_after_last_merge() {
        let commits = vec![
            commit("C1", CommitStatus::Pending),
            commit("M1", CommitStatus::MergerCommit),
            commit("C2", CommitStatus::Pending),
            commit("C3", CommitStatus::Merged),
            commit("C4", CommitStatus::Pending),
        ];
        assert_eq!(hashes(&pending_since_last_merge(&commits)), vec!["C2", "C4"]);
    }
}
