//! UID sets for UID SEARCH/FETCH/STORE.

use std::fmt;

use super::Uid;

/// A set of UIDs, stored as sorted, non-overlapping inclusive ranges.
///
/// Serializes to the compact `1:3,7,9:12` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UidSet {
    ranges: Vec<(Uid, Uid)>,
}

impl UidSet {
    /// A set with exactly one UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self {
            ranges: vec![(uid, uid)],
        }
    }

    /// Builds a set from arbitrary UIDs, merging adjacent values into ranges.
    pub fn from_uids(uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut values: Vec<Uid> = uids.into_iter().collect();
        values.sort_unstable();
        values.dedup();

        let mut ranges: Vec<(Uid, Uid)> = Vec::new();
        for uid in values {
            match ranges.last_mut() {
                Some((_, end)) if end.get().checked_add(1) == Some(uid.get()) => *end = uid,
                _ => ranges.push((uid, uid)),
            }
        }
        Self { ranges }
    }

    /// Returns true if the set holds no UIDs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns true if the UID is a member.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.ranges
            .iter()
            .any(|(start, end)| *start <= uid && uid <= *end)
    }

    /// Number of UIDs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|(start, end)| (end.get() - start.get()) as usize + 1)
            .sum()
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
    }
}
