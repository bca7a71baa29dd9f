/// Fixed-size pool of kernel objects. Slot usage is tracked in a bitmap, where
/// a 1 bit means the slot is in use, and allocation fails once every slot is
/// taken.
#[derive(Debug)]
pub(crate) struct ObjectPool<T> {
    bitmap: Vec<u8>,
    objects: Vec<Option<T>>,
}

impl<T> ObjectPool<T> {
    const BITS_PER_CHUNK: usize = u8::BITS as usize;

    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            bitmap: vec![0; capacity.div_ceil(Self::BITS_PER_CHUNK)],
            objects: (0..capacity).map(|_| None).collect(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.objects.len()
    }

    fn mark_used(&mut self, slot: usize) {
        let index = slot / Self::BITS_PER_CHUNK;
        let bit = slot % Self::BITS_PER_CHUNK;
        assert!(
            self.bitmap[index] & (1 << bit) == 0,
            "slot {slot} is already used"
        );
        self.bitmap[index] |= 1 << bit;
    }

    fn mark_unused(&mut self, slot: usize) {
        let index = slot / Self::BITS_PER_CHUNK;
        let bit = slot % Self::BITS_PER_CHUNK;
        assert!(
            self.bitmap[index] & (1 << bit) != 0,
            "slot {slot} is already unused"
        );
        self.bitmap[index] &= !(1 << bit);
    }

    /// Finds the lowest free slot.
    fn find_free(&self) -> Option<usize> {
        for (i, byte) in self.bitmap.iter().enumerate() {
            // Shortcut: a full byte has no free slots.
            if *byte == u8::MAX {
                continue;
            }
            let slot = i * Self::BITS_PER_CHUNK + byte.trailing_ones() as usize;
            if slot < self.capacity() {
                return Some(slot);
            }
        }
        None
    }

    /// Stores `object` in a free slot and returns the slot, or `None` if the
    /// pool is exhausted.
    pub(crate) fn allocate(&mut self, object: T) -> Option<usize> {
        let slot = self.find_free()?;
        self.mark_used(slot);
        self.objects[slot] = Some(object);
        Some(slot)
    }

    pub(crate) fn free(&mut self, slot: usize) -> T {
        self.mark_unused(slot);
        self.objects[slot]
            .take()
            .unwrap_or_else(|| panic!("slot {slot} has no object"))
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&T> {
        self.objects.get(slot)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.objects.get_mut(slot)?.as_mut()
    }

    pub(crate) fn live(&self) -> usize {
        self.bitmap.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(slot, object)| Some((slot, object.as_ref()?)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn simple_test() {
        let mut pool = ObjectPool::new(10);
        assert_eq!(pool.allocate('a'), Some(0));
        assert_eq!(pool.allocate('b'), Some(1));
        assert_eq!(pool.allocate('c'), Some(2));
        assert_eq!(pool.bitmap, [0b0000_0111, 0b0000_0000]);

        assert_eq!(pool.free(1), 'b');
        assert_eq!(pool.get(1), None);
        assert_eq!(pool.allocate('d'), Some(1));
        assert_eq!(pool.get(1), Some(&'d'));
        assert_eq!(pool.live(), 3);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut pool = ObjectPool::new(9);
        for i in 0..9 {
            assert_eq!(pool.allocate(i), Some(i));
        }
        assert_eq!(pool.allocate(99), None);

        pool.free(8);
        assert_eq!(pool.allocate(99), Some(8));
    }

    #[test]
    #[should_panic(expected = "already unused")]
    fn double_free_panics() {
        let mut pool = ObjectPool::new(4);
        let slot = pool.allocate(()).unwrap();
        pool.free(slot);
        pool.free(slot);
    }

    #[derive(Debug, Clone)]
    enum AllocOrFree {
        Alloc(u32),
        Free(usize),
    }

    fn alloc_or_free_strategy() -> impl Strategy<Value = AllocOrFree> {
        prop_oneof![
            any::<u32>().prop_map(AllocOrFree::Alloc),
            prop::num::usize::ANY.prop_map(AllocOrFree::Free),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 2_000, .. ProptestConfig::default()
        })]

        #[test]
        fn alloc_free(
            capacity in 1..40_usize,
            ops in prop::collection::vec(alloc_or_free_strategy(), 1..100)
        ) {
            let mut pool = ObjectPool::new(capacity);

            // N.B. BTreeMap gives us consistent iteration order, which is
            // important for determinism. We get randomness from the index we
            // use for `Free`.
            let mut expected = BTreeMap::new();

            for op in ops {
                match op {
                    AllocOrFree::Alloc(value) => match pool.allocate(value) {
                        Some(slot) => {
                            prop_assert!(slot < capacity);
                            prop_assert!(expected.insert(slot, value).is_none());
                        }
                        None => prop_assert_eq!(expected.len(), capacity),
                    },
                    AllocOrFree::Free(raw_idx) => {
                        if expected.is_empty() {
                            continue;
                        }
                        let slot = *expected.keys().nth(raw_idx % expected.len()).unwrap();
                        let value = expected.remove(&slot).unwrap();
                        prop_assert_eq!(pool.free(slot), value);
                    }
                }
                prop_assert_eq!(pool.live(), expected.len());
            }

            for (slot, value) in expected {
                prop_assert_eq!(pool.get(slot), Some(&value));
            }
        }
    }
}
