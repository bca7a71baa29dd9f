//! Fixed-capacity ring buffer that overwrites its oldest element when full.
//! Used to keep a short history of recent events without allocating.

#![cfg_attr(not(test), no_std)]

/// A static, append-only ring buffer holding the last `N` pushed elements.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    /// The fixed-size array of elements.
    elements: [Option<T>; N],

    /// The index of the next free location.
    next_free: usize,

    /// Number of elements currently stored, at most `N`.
    len: usize,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    pub const fn new() -> Self {
        Self {
            elements: [None; N],
            next_free: 0,
            len: 0,
        }
    }

    /// Append an element to the ring buffer. This will overwrite the oldest
    /// element if the buffer is full.
    pub fn push(&mut self, element: T) {
        if N == 0 {
            return;
        }
        self.elements[self.next_free] = Some(element);
        self.next_free = (self.next_free + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Get the element at the given index, where the index counts backwards
    /// from the latest element. For example, `0` is the element most recently
    /// pushed and `len() - 1` is the oldest element still stored.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }

        let slot = (self.next_free + N - 1 - index) % N;
        self.elements[slot]
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates from the most recent element to the oldest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).filter_map(move |index| self.get(index))
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn push_and_get() {
        let mut buffer = RingBuffer::<u8, 3>::new();
        assert!(buffer.is_empty());
        buffer.push(1);
        assert_eq!(buffer.get(0), Some(1));
        assert_eq!(buffer.get(1), None);

        buffer.push(2);
        assert_eq!(buffer.get(0), Some(2));
        assert_eq!(buffer.get(1), Some(1));
        assert_eq!(buffer.get(2), None);

        buffer.push(3);
        assert_eq!(buffer.get(0), Some(3));
        assert_eq!(buffer.get(1), Some(2));
        assert_eq!(buffer.get(2), Some(1));
        assert_eq!(buffer.get(3), None);

        // Wrap around
        buffer.push(4);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![4, 3, 2]);
    }

    proptest! {
        #[test]
        fn matches_bounded_deque(pushes in prop::collection::vec(any::<u16>(), 0..40)) {
            let mut buffer = RingBuffer::<u16, 7>::new();
            let mut expected = VecDeque::new();
            for value in pushes {
                buffer.push(value);
                expected.push_front(value);
                expected.truncate(7);
            }

            prop_assert_eq!(buffer.len(), expected.len());
            prop_assert_eq!(buffer.iter().collect::<Vec<_>>(), expected.into_iter().collect::<Vec<_>>());
        }
    }
}
