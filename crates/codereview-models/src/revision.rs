//! Revisions linked to tracked items and the sets presented for review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An immutable change reference linked to a tracked item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Revision name as reported by the repository (e.g. `"1234"`).
    pub name: String,

    /// Repository the revision belongs to, if not the default one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Author of the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Commit message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the change was committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl Revision {
    /// Creates a revision reference with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: None,
            author: None,
            message: None,
            created: None,
        }
    }

    /// Returns the numeric revision, if the name is numeric.
    pub fn number(&self) -> Option<i64> {
        self.name.parse().ok()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repository {
            Some(repository) => write!(f, "{}@{}", self.name, repository),
            None => f.write_str(&self.name),
        }
    }
}

/// How a [`RevisionSet`] decides which linked revisions are already reviewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSelection {
    /// Everything above the baseline is pending; `None` means from the beginning.
    Baseline(Option<i64>),
    /// An explicit closed set of reviewed revision names, kept with its raw form.
    Reviewed {
        raw: String,
        names: BTreeSet<String>,
    },
}

/// Revisions presented for review.
///
/// Pairs the item's linked revisions with the selection that tells which of
/// them were already reviewed. Revisions without a numeric name are never
/// covered by a baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionSet {
    linked: Vec<Revision>,
    selection: RevisionSelection,
}

impl RevisionSet {
    /// Creates a set of the linked revisions above `baseline`.
    pub fn above(linked: Vec<Revision>, baseline: Option<i64>) -> Self {
        Self {
            linked,
            selection: RevisionSelection::Baseline(baseline),
        }
    }

    /// Creates a set described by a raw reviewed-revisions string.
    ///
    /// Names are separated by commas and/or whitespace.
    pub fn reviewed(linked: Vec<Revision>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let names = parse_names(&raw);
        Self {
            linked,
            selection: RevisionSelection::Reviewed { raw, names },
        }
    }

    /// Returns all linked revisions.
    pub fn linked(&self) -> &[Revision] {
        &self.linked
    }

    /// Returns the selection rule.
    pub fn selection(&self) -> &RevisionSelection {
        &self.selection
    }

    /// Returns the baseline, if this set is baseline-driven.
    pub fn baseline(&self) -> Option<i64> {
        match self.selection {
            RevisionSelection::Baseline(baseline) => baseline,
            RevisionSelection::Reviewed { .. } => None,
        }
    }

    /// Returns the raw reviewed-revisions string, if this set is explicit.
    pub fn raw(&self) -> Option<&str> {
        match &self.selection {
            RevisionSelection::Reviewed { raw, .. } => Some(raw),
            RevisionSelection::Baseline(_) => None,
        }
    }

    /// Returns true if `revision` is already reviewed.
    pub fn is_reviewed(&self, revision: &Revision) -> bool {
        match &self.selection {
            RevisionSelection::Baseline(None) => false,
            RevisionSelection::Baseline(Some(baseline)) => {
                revision.number().is_some_and(|n| n <= *baseline)
            }
            RevisionSelection::Reviewed { names, .. } => names.contains(&revision.name),
        }
    }

    /// Returns the linked revisions still to be reviewed, in link order.
    pub fn pending(&self) -> Vec<&Revision> {
        self.linked.iter().filter(|r| !self.is_reviewed(r)).collect()
    }

    /// Returns true if nothing is left to review.
    pub fn is_fully_reviewed(&self) -> bool {
        self.linked.iter().all(|r| self.is_reviewed(r))
    }

    /// Renders the raw reviewed-revisions string after marking `additional`
    /// as reviewed.
    ///
    /// Existing reviewed names come first in link order, then names not
    /// linked to the item, so the result is stable across calls.
    pub fn mark_reviewed<'a>(&self, additional: impl IntoIterator<Item = &'a str>) -> String {
        let extra: BTreeSet<&str> = additional.into_iter().collect();
        let mut names: Vec<&str> = self
            .linked
            .iter()
            .filter(|r| self.is_reviewed(r) || extra.contains(r.name.as_str()))
            .map(|r| r.name.as_str())
            .collect();
        if let RevisionSelection::Reviewed { names: reviewed, .. } = &self.selection {
            for name in reviewed {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        for name in extra {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.join(",")
    }
}

fn parse_names(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
