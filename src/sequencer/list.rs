//! Non-empty waypoint list with a tracked current index.
//!
//! [`WaypointList`] holds the only copy of the list and the current index and
//! keeps `0 <= current < len` and `len >= 1` across every edit.

use crate::core::types::Waypoint;
use crate::error::{Error, Result};

/// Where to insert a new waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// After the last waypoint
    Append,
    /// Before the waypoint currently at this index (`== len` appends)
    At(usize),
}

impl InsertPosition {
    /// Wire sentinel meaning "append".
    pub const APPEND_SENTINEL: i64 = -1;

    /// Convert a raw request index; `-1` appends, other negatives are invalid.
    pub fn from_raw(index: i64, len: usize) -> Result<Self> {
        if index == Self::APPEND_SENTINEL {
            return Ok(InsertPosition::Append);
        }
        usize::try_from(index)
            .map(InsertPosition::At)
            .map_err(|_| Error::IndexOutOfRange { index, len })
    }
}

/// What a removal did to the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The current waypoint was removed; the index now refers to a new target
    CurrentReplaced,
    /// The current waypoint survived (its index may have shifted)
    CurrentKept,
}

/// Ordered, never-empty list of waypoints plus the current index.
#[derive(Debug, Clone)]
pub struct WaypointList {
    waypoints: Vec<Waypoint>,
    current: usize,
    cyclical: bool,
}

impl WaypointList {
    /// Create a list targeting the first waypoint.
    pub fn new(waypoints: Vec<Waypoint>, cyclical: bool) -> Result<Self> {
        if waypoints.is_empty() {
            return Err(Error::MissingInitialWaypoints);
        }
        Ok(Self {
            waypoints,
            current: 0,
            cyclical,
        })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_cyclical(&self) -> bool {
        self.cyclical
    }

    pub fn current(&self) -> &Waypoint {
        &self.waypoints[self.current]
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Move to the next waypoint, wrapping or clamping at the end.
    pub fn advance(&mut self) {
        self.current += 1;
        self.wrap_index();
    }

    /// Bring the current index back inside the list.
    ///
    /// Cyclic lists wrap modulo the length; otherwise the index is held on
    /// the last waypoint.
    fn wrap_index(&mut self) {
        let len = self.waypoints.len();
        if self.cyclical {
            self.current %= len;
        } else if self.current >= len {
            self.current = len - 1;
        }
    }

    /// Insert a waypoint and return the new length.
    ///
    /// Inserting at or before the current index shifts the index so it keeps
    /// pointing at the same waypoint.
    pub fn insert(&mut self, waypoint: Waypoint, position: InsertPosition) -> Result<usize> {
        let len = self.waypoints.len();
        let index = match position {
            InsertPosition::Append => len,
            InsertPosition::At(i) if i <= len => i,
            InsertPosition::At(i) => {
                return Err(Error::IndexOutOfRange {
                    index: i as i64,
                    len,
                });
            }
        };

        self.waypoints.insert(index, waypoint);
        if self.current >= index {
            self.current += 1;
        }
        Ok(self.waypoints.len())
    }

    /// Remove the waypoint at `index`.
    ///
    /// The last remaining waypoint can never be removed. Returns the new
    /// length and whether the current target changed.
    pub fn remove(&mut self, index: usize) -> Result<(usize, RemoveOutcome)> {
        let len = self.waypoints.len();
        if len == 1 {
            return Err(Error::CannotRemoveLastWaypoint);
        }
        if index >= len {
            return Err(Error::IndexOutOfRange {
                index: index as i64,
                len,
            });
        }

        self.waypoints.remove(index);

        let outcome = if index == self.current {
            self.wrap_index();
            RemoveOutcome::CurrentReplaced
        } else {
            if self.current >= self.waypoints.len() {
                self.current -= 1;
            }
            RemoveOutcome::CurrentKept
        };
        Ok((self.waypoints.len(), outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wp(n: f64) -> Waypoint {
        Waypoint::new(n, n, 10.0, 0.0)
    }

    fn three(cyclical: bool) -> WaypointList {
        WaypointList::new(vec![wp(0.0), wp(5.0), wp(10.0)], cyclical).unwrap()
    }

    fn assert_invariant(list: &WaypointList) {
        assert!(!list.is_empty());
        assert!(list.current_index() < list.len());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            WaypointList::new(Vec::new(), true),
            Err(Error::MissingInitialWaypoints)
        ));
    }

    #[test]
    fn test_insert_position_from_raw() {
        assert_eq!(InsertPosition::from_raw(-1, 3).unwrap(), InsertPosition::Append);
        assert_eq!(InsertPosition::from_raw(2, 3).unwrap(), InsertPosition::At(2));
        assert!(matches!(
            InsertPosition::from_raw(-2, 3),
            Err(Error::IndexOutOfRange { index: -2, len: 3 })
        ));
    }

    #[test]
    fn test_advance_wraps_when_cyclical() {
        let mut list = three(true);
        list.advance();
        list.advance();
        assert_eq!(list.current_index(), 2);
        list.advance();
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_advance_clamps_when_not_cyclical() {
        let mut list = three(false);
        for _ in 0..5 {
            list.advance();
            assert_invariant(&list);
        }
        assert_eq!(list.current_index(), 2);
    }

    #[test]
    fn test_append_adds_to_end() {
        let mut list = three(true);
        let len = list.insert(wp(42.0), InsertPosition::Append).unwrap();
        assert_eq!(len, 4);
        assert_eq!(list.as_slice()[3], wp(42.0));
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_insert_at_len_appends() {
        let mut list = three(true);
        list.insert(wp(42.0), InsertPosition::At(3)).unwrap();
        assert_eq!(list.as_slice()[3], wp(42.0));
    }

    #[test]
    fn test_insert_before_current_shifts_index() {
        let mut list = three(true);
        list.advance();
        let target = *list.current();
        list.insert(wp(1.0), InsertPosition::At(1)).unwrap();
        assert_eq!(list.current_index(), 2);
        assert_eq!(*list.current(), target);
    }

    #[test]
    fn test_insert_after_current_keeps_index() {
        let mut list = three(true);
        list.insert(wp(1.0), InsertPosition::At(1)).unwrap();
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_insert_out_of_range_leaves_list_unchanged() {
        let mut list = three(true);
        let err = list.insert(wp(1.0), InsertPosition::At(4)).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 4, len: 3 }));
        assert_eq!(list.len(), 3);
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_remove_last_remaining_fails() {
        let mut list = WaypointList::new(vec![wp(0.0)], true).unwrap();
        assert!(matches!(list.remove(0), Err(Error::CannotRemoveLastWaypoint)));
        // Single-element check wins over range check
        assert!(matches!(list.remove(7), Err(Error::CannotRemoveLastWaypoint)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut list = three(true);
        assert!(matches!(
            list.remove(5),
            Err(Error::IndexOutOfRange { index: 5, len: 3 })
        ));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_current_selects_following_waypoint() {
        let mut list = three(true);
        list.advance();
        let (len, outcome) = list.remove(1).unwrap();
        assert_eq!(len, 2);
        assert_eq!(outcome, RemoveOutcome::CurrentReplaced);
        assert_eq!(list.current_index(), 1);
        assert_eq!(*list.current(), wp(10.0));
    }

    #[test]
    fn test_remove_current_at_end_wraps_when_cyclical() {
        let mut list = three(true);
        list.advance();
        list.advance();
        let (_, outcome) = list.remove(2).unwrap();
        assert_eq!(outcome, RemoveOutcome::CurrentReplaced);
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_remove_current_at_end_clamps_when_not_cyclical() {
        let mut list = three(false);
        list.advance();
        list.advance();
        list.remove(2).unwrap();
        assert_eq!(list.current_index(), 1);
        assert_eq!(*list.current(), wp(5.0));
    }

    #[test]
    fn test_remove_before_current_at_end_follows_target() {
        let mut list = three(true);
        list.advance();
        list.advance();
        let (_, outcome) = list.remove(0).unwrap();
        assert_eq!(outcome, RemoveOutcome::CurrentKept);
        assert_eq!(list.current_index(), 1);
        assert_eq!(*list.current(), wp(10.0));
    }

    #[test]
    fn test_remove_before_current_inside_list_keeps_numeric_index() {
        // Index only shifts when it falls off the shrunk list
        let mut list = WaypointList::new(vec![wp(0.0), wp(5.0), wp(10.0), wp(15.0)], true).unwrap();
        list.advance();
        let (_, outcome) = list.remove(0).unwrap();
        assert_eq!(outcome, RemoveOutcome::CurrentKept);
        assert_eq!(list.current_index(), 1);
        assert_eq!(*list.current(), wp(10.0));
    }

    #[test]
    fn test_remove_after_current_keeps_index() {
        let mut list = three(true);
        let (_, outcome) = list.remove(2).unwrap();
        assert_eq!(outcome, RemoveOutcome::CurrentKept);
        assert_eq!(list.current_index(), 0);
    }

    #[test]
    fn test_invariant_under_mixed_edits() {
        let mut list = three(false);
        let ops: [(bool, usize); 8] = [
            (true, 0),
            (false, 3),
            (true, 1),
            (false, 0),
            (false, 0),
            (true, 2),
            (false, 1),
            (false, 0),
        ];
        for (insert, i) in ops {
            if insert {
                let _ = list.insert(wp(i as f64), InsertPosition::At(i));
            } else {
                let _ = list.remove(i);
            }
            list.advance();
            assert_invariant(&list);
        }
    }
}
