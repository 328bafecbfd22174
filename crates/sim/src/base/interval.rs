//! Static interval index over inclusive polymer coordinates.
//!
//! The tree is built once from a list of intervals and then answers two
//! queries: which intervals overlap a range, and which intervals are fully
//! contained in a range. Polymers store indices into their own feature
//! arenas as interval values, so the index never owns feature state.

/// A closed interval `[start, stop]` carrying a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval<T> {
    pub start: u32,
    pub stop: u32,
    pub value: T,
}

impl<T> Interval<T> {
    pub fn new(start: u32, stop: u32, value: T) -> Self {
        Self { start, stop, value }
    }

    /// Does this interval share at least one position with `[start, stop]`?
    #[inline]
    pub fn overlaps(&self, start: u32, stop: u32) -> bool {
        self.start <= stop && self.stop >= start
    }

    /// Does `[start, stop]` fully contain this interval?
    #[inline]
    pub fn contained_in(&self, start: u32, stop: u32) -> bool {
        self.start >= start && self.stop <= stop
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    center: u32,
    /// Intervals spanning `center`, sorted by start.
    intervals: Vec<Interval<T>>,
    /// Every interval in `left` stops before `center`.
    left: Option<Box<Node<T>>>,
    /// Every interval in `right` starts after `center`.
    right: Option<Box<Node<T>>>,
    min_start: u32,
    max_stop: u32,
}

impl<T> Node<T> {
    fn build(mut intervals: Vec<Interval<T>>) -> Option<Box<Self>> {
        if intervals.is_empty() {
            return None;
        }
        intervals.sort_by_key(|i| (i.start, i.stop));

        // The median interval always spans the center, so each level
        // consumes at least one interval.
        let center = intervals[intervals.len() / 2].start;
        let min_start = intervals[0].start;
        let max_stop = intervals.iter().map(|i| i.stop).max().unwrap_or(center);

        let mut here = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for interval in intervals {
            if interval.stop < center {
                left.push(interval);
            } else if interval.start > center {
                right.push(interval);
            } else {
                here.push(interval);
            }
        }

        Some(Box::new(Self {
            center,
            intervals: here,
            left: Self::build(left),
            right: Self::build(right),
            min_start,
            max_stop,
        }))
    }

    /// Visit every interval that might overlap `[start, stop]` and keep the
    /// ones accepted by `keep`.
    fn collect<'a, F>(&'a self, start: u32, stop: u32, keep: &F, out: &mut Vec<&'a Interval<T>>)
    where
        F: Fn(&Interval<T>) -> bool,
    {
        if self.max_stop < start || self.min_start > stop {
            return;
        }
        out.extend(self.intervals.iter().filter(|i| keep(i)));
        if start < self.center {
            if let Some(left) = &self.left {
                left.collect(start, stop, keep, out);
            }
        }
        if stop > self.center {
            if let Some(right) = &self.right {
                right.collect(start, stop, keep, out);
            }
        }
    }

    fn for_each<'a>(&'a self, out: &mut Vec<&'a Interval<T>>) {
        if let Some(left) = &self.left {
            left.for_each(out);
        }
        out.extend(self.intervals.iter());
        if let Some(right) = &self.right {
            right.for_each(out);
        }
    }
}

/// Centered interval tree.
#[derive(Debug, Clone)]
pub struct IntervalTree<T> {
    root: Option<Box<Node<T>>>,
    len: usize,
}

impl<T> Default for IntervalTree<T> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<T> IntervalTree<T> {
    /// Build a tree from a list of intervals.
    pub fn new(intervals: Vec<Interval<T>>) -> Self {
        let len = intervals.len();
        Self {
            root: Node::build(intervals),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All intervals with `i.start <= stop && i.stop >= start`, ordered by
    /// start position.
    pub fn find_overlapping(&self, start: u32, stop: u32) -> Vec<&Interval<T>> {
        self.query(start, stop, |i| i.overlaps(start, stop))
    }

    /// All intervals with `i.start >= start && i.stop <= stop`, ordered by
    /// start position.
    pub fn find_contained(&self, start: u32, stop: u32) -> Vec<&Interval<T>> {
        if start > stop {
            return Vec::new();
        }
        self.query(start, stop, |i| i.contained_in(start, stop))
    }

    /// Every interval in the tree, ordered by start position.
    pub fn iter(&self) -> impl Iterator<Item = &Interval<T>> {
        let mut out = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            root.for_each(&mut out);
        }
        out.sort_by_key(|i| (i.start, i.stop));
        out.into_iter()
    }

    fn query<F>(&self, start: u32, stop: u32, keep: F) -> Vec<&Interval<T>>
    where
        F: Fn(&Interval<T>) -> bool,
    {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect(start, stop, &keep, &mut out);
        }
        out.sort_by_key(|i| (i.start, i.stop));
        out
    }
}

impl<T> FromIterator<Interval<T>> for IntervalTree<T> {
    fn from_iter<I: IntoIterator<Item = Interval<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
