use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map of shared handles, each with a use count.
///
/// Decrementing to zero keeps the entry ("weak") until [`purge_weak`](`RcHashMap::purge_weak`),
/// so that a handle released and re-acquired within one render is reused.
#[derive(Debug)]
pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	pub fn increment_or_insert_with<F: FnOnce() -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let (_, v) = vacant.insert((C::one(), v()));
				Ok(v)
			}
		}
	}

	pub fn weak_decrement<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Drops all entries with a count of zero and returns how many there were.
	pub fn purge_weak(&mut self) -> usize {
		let before = self.0.len();
		self.0.retain(|_, (c, _)| !c.is_zero());
		before - self.0.len()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_and_purges() {
		let mut map = RcHashMap::<&str, u8, u32>::new();
		let mut created = 0;
		for _ in 0..2 {
			map.increment_or_insert_with("click", || {
				created += 1;
				7
			})
			.unwrap();
		}
		assert_eq!(created, 1);

		assert_eq!(map.weak_decrement("click").unwrap().copied(), Some(7));
		assert_eq!(map.purge_weak(), 0);
		assert_eq!(map.weak_decrement("click").unwrap().copied(), Some(7));
		assert_eq!(map.len(), 1);
		assert_eq!(map.purge_weak(), 1);
		assert_eq!(map.len(), 0);
		assert_eq!(map.weak_decrement("click").unwrap(), None);
	}

	#[test]
	fn saturation() {
		let mut map = RcHashMap::<u8, u8, ()>::new();
		for _ in 0..u8::MAX {
			map.increment_or_insert_with(0, || ()).unwrap();
		}
		assert_eq!(map.increment_or_insert_with(0, || ()).err(), Some(CountSaturatedError));
		assert_eq!(map.weak_decrement(&1), Ok(None));
	}
}
