//! Keyed list reconciliation, independent of any DOM.
//!
//! [`diff`] matches items by key and keeps the longest run of items whose relative order didn't change in place.
//! Every other surviving item is moved exactly once, so a reorder costs as few moves as possible.

use core::hash::Hash;
use hashbrown::{HashMap, HashSet};

/// Where the item at one position of the new list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	/// Reuses the old item at this index without moving it.
	Keep(usize),
	/// Reuses the old item at this index, moving it into place.
	Move(usize),
	/// A new item.
	Insert,
}

/// How to turn an old keyed list into a new one.
///
/// Apply it by first removing [`EditScript::removed`], then walking [`EditScript::placements`] from last to first,
/// placing each item before the one that follows it (or at the end).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
	/// Old indices without a counterpart in the new list, ascending.
	pub removed: Vec<usize>,
	/// One entry per new item.
	pub placements: Vec<Placement>,
	/// New items whose key was already used earlier in the new list. These are always inserted.
	pub duplicates: usize,
}
impl EditScript {
	#[must_use]
	pub fn moves(&self) -> usize {
		self.placements.iter().filter(|p| matches!(p, Placement::Move(_))).count()
	}

	#[must_use]
	pub fn inserts(&self) -> usize {
		self.placements.iter().filter(|p| matches!(p, Placement::Insert)).count()
	}
}

#[must_use]
pub fn diff<K: Eq + Hash>(old: &[K], new: &[K]) -> EditScript {
	let mut old_indices: HashMap<&K, usize> = HashMap::with_capacity(old.len());
	for (index, key) in old.iter().enumerate() {
		old_indices.entry(key).or_insert(index);
	}

	let mut used = vec![false; old.len()];
	let mut seen: HashSet<&K> = HashSet::with_capacity(new.len());
	let mut duplicates = 0;
	let mut sources = Vec::with_capacity(new.len());
	for key in new {
		if !seen.insert(key) {
			duplicates += 1;
			sources.push(None);
			continue;
		}
		sources.push(match old_indices.get(key) {
			Some(&index) if !used[index] => {
				used[index] = true;
				Some(index)
			}
			_ => None,
		});
	}

	let stable = longest_increasing_run(&sources);
	EditScript {
		removed: (0..old.len()).filter(|&index| !used[index]).collect(),
		placements: sources
			.iter()
			.zip(stable)
			.map(|(source, stable)| match *source {
				Some(index) if stable => Placement::Keep(index),
				Some(index) => Placement::Move(index),
				None => Placement::Insert,
			})
			.collect(),
		duplicates,
	}
}

/// Marks the members of a longest strictly increasing subsequence of the present sources.
fn longest_increasing_run(sources: &[Option<usize>]) -> Vec<bool> {
	// `tails[n]` is the position of the smallest tail of any increasing run of length `n + 1` found so far.
	let mut tails: Vec<usize> = Vec::new();
	let mut predecessors: Vec<Option<usize>> = vec![None; sources.len()];
	for (position, source) in sources.iter().enumerate() {
		let Some(value) = *source else { continue };
		let length = tails.partition_point(|&tail| sources[tail].map_or(false, |tail| tail < value));
		if length > 0 {
			predecessors[position] = Some(tails[length - 1]);
		}
		if length == tails.len() {
			tails.push(position);
		} else {
			tails[length] = position;
		}
	}

	let mut stable = vec![false; sources.len()];
	let mut next = tails.last().copied();
	while let Some(position) = next {
		stable[position] = true;
		next = predecessors[position];
	}
	stable
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn rotation_is_one_move() {
		let script = diff(&['a', 'b', 'c'], &['c', 'a', 'b']);
		assert_eq!(script.placements, vec![Placement::Move(2), Placement::Keep(0), Placement::Keep(1)]);
		assert!(script.removed.is_empty());
		assert_eq!(script.moves(), 1);
	}

	#[test]
	fn unchanged_lists_keep_everything() {
		let script = diff(&[1, 2, 3], &[1, 2, 3]);
		assert_eq!(script.placements, vec![Placement::Keep(0), Placement::Keep(1), Placement::Keep(2)]);
	}

	#[test]
	fn reversal_keeps_one() {
		let script = diff(&[1, 2, 3, 4], &[4, 3, 2, 1]);
		assert_eq!(script.moves(), 3);
		assert_eq!(script.inserts(), 0);
	}

	#[test]
	fn removals_and_inserts() {
		let script = diff(&["a", "b", "c", "d"], &["d", "x", "b"]);
		assert_eq!(script.removed, vec![0, 2]);
		assert_eq!(script.inserts(), 1);
		assert_eq!(script.moves(), 1);
		assert_eq!(script.placements[1], Placement::Insert);
	}

	#[test]
	fn duplicate_keys_are_inserted() {
		let script = diff(&[1, 2], &[1, 1, 2]);
		assert_eq!(script.duplicates, 1);
		assert_eq!(script.placements, vec![Placement::Keep(0), Placement::Insert, Placement::Keep(1)]);
	}

	#[test]
	fn empty_lists() {
		assert_eq!(diff::<u8>(&[], &[]), EditScript::default());
		assert_eq!(diff(&[1, 2], &[]).removed, vec![0, 1]);
		assert_eq!(diff(&[], &[1, 2]).inserts(), 2);
	}
}
