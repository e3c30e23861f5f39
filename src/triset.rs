//! Tri-color key set driving the mark phase.
//!
//! The set maps every observed key to a single one-byte color cell and
//! keeps a LIFO stack of keys still waiting to have their links explored.
//! Which physical color currently means "white", "gray" or "black" is a
//! property of the set, not of the cell, so relabeling the whole
//! population costs nothing.

use std::collections::{HashMap, HashSet};

use crate::cid::Cid;

/// A physical cell color. Absence from the map is the fourth state: the
/// key has never been observed and is semantically white.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    C1 = 1,
    C2 = 2,
    C3 = 3,
}

/// The role a cell currently plays, read through the set's labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Believed unreachable; a sweep candidate.
    White,
    /// Reachable, descendants not yet explored.
    Gray,
    /// Reachable and fully explored, or promoted terminally.
    Black,
}

/// Color-annotated key set with a gray work stack.
///
/// Within one mark phase a key's color only advances, white to gray to
/// black. "Reset everything to white" between phases is done by rotating
/// the role labels, never by rewriting cells.
pub struct Triset {
    white: Color,
    gray: Color,
    black: Color,
    /// Color given to keys inserted by store enumeration. Initially equal
    /// to `white`; rotation may point it elsewhere.
    fresh: Color,

    /// LIFO stack of keys believed gray. Entries are not removed when a
    /// key is blackened out of band; `pop_gray` discards stale ones.
    grays: Vec<Cid>,

    /// One-byte cell per observed key. Updates recolor in place and
    /// allocate nothing.
    colmap: HashMap<Box<[u8]>, Color>,

    /// Currently-gray keys whose links must be fetched strictly. The hint
    /// only ever upgrades: once a key is recorded here it stays until it
    /// is popped or blackened.
    strict: HashSet<Cid>,
}

impl Triset {
    pub fn new() -> Self {
        Self::with_capacity(1 << 10)
    }

    /// Create a set whose gray stack is pre-allocated for `gray_capacity`
    /// entries.
    pub fn with_capacity(gray_capacity: usize) -> Self {
        Self {
            white: Color::C1,
            gray: Color::C2,
            black: Color::C3,
            fresh: Color::C1,
            grays: Vec::with_capacity(gray_capacity),
            colmap: HashMap::new(),
            strict: HashSet::new(),
        }
    }

    /// Insert a key seen during store enumeration.
    ///
    /// Absent keys get the `fresh` color. A key that is currently white is
    /// recolored to `fresh` only when `fresh` differs from `white`, which
    /// tags "seen by this enumeration" distinctly from "never seen". Gray
    /// and black keys are never demoted.
    pub fn insert_fresh(&mut self, cid: &Cid) {
        let key = cid.to_bytes();
        if let Some(cell) = self.colmap.get_mut(key) {
            if *cell == self.white && self.fresh != self.white {
                *cell = self.fresh;
            }
        } else {
            self.colmap.insert(key.into(), self.fresh);
        }
    }

    /// Insert at white iff the key has never been observed.
    pub fn insert_white(&mut self, cid: &Cid) {
        if !self.colmap.contains_key(cid.to_bytes()) {
            self.colmap.insert(cid.to_bytes().into(), self.white);
        }
    }

    /// Insert as gray, extending the mark frontier.
    ///
    /// Only absent or white keys turn gray; gray and black keys are left
    /// alone, which is what makes black absorbing. `strict` records the
    /// link-fetch policy handed back by [`Triset::pop_gray`]; re-graying a
    /// key can upgrade the hint to strict but never downgrade it.
    pub fn insert_gray(&mut self, cid: &Cid, strict: bool) {
        let key = cid.to_bytes();
        if let Some(cell) = self.colmap.get_mut(key) {
            if *cell == self.white {
                *cell = self.gray;
                self.grays.push(cid.clone());
                if strict {
                    self.strict.insert(cid.clone());
                }
            } else if *cell == self.gray && strict {
                self.strict.insert(cid.clone());
            }
        } else {
            self.colmap.insert(key.into(), self.gray);
            self.grays.push(cid.clone());
            if strict {
                self.strict.insert(cid.clone());
            }
        }
    }

    /// Unconditionally paint a key black.
    ///
    /// Any stack entry for the key becomes stale and is discarded by
    /// `pop_gray`, keeping this O(1).
    pub fn blacken(&mut self, cid: &Cid) {
        let key = cid.to_bytes();
        if let Some(cell) = self.colmap.get_mut(key) {
            *cell = self.black;
        } else {
            self.colmap.insert(key.into(), self.black);
        }
        self.strict.remove(cid);
    }

    /// Pop the next gray key, skipping entries that are no longer gray.
    ///
    /// The returned key is painted black before being handed back, so the
    /// caller must enumerate its links immediately. The boolean is the
    /// strict-fetch hint recorded when the key was grayed.
    pub fn pop_gray(&mut self) -> Option<(Cid, bool)> {
        let (gray, black) = (self.gray, self.black);
        while let Some(cid) = self.grays.pop() {
            if let Some(cell) = self.colmap.get_mut(cid.to_bytes()) {
                if *cell == gray {
                    *cell = black;
                    let strict = self.strict.remove(&cid);
                    return Some((cid, strict));
                }
            }
        }
        None
    }

    /// Reassign the role labels onto the physical colors.
    ///
    /// `white`, `gray` and `black` must be pairwise distinct so every cell
    /// still reads as exactly one role; `fresh` may alias any of them. The
    /// map itself is untouched, which is what makes mass recoloring free.
    pub fn rotate_roles(&mut self, white: Color, gray: Color, black: Color, fresh: Color) {
        assert!(
            white != gray && gray != black && white != black,
            "role labels must map to distinct colors"
        );
        self.white = white;
        self.gray = gray;
        self.black = black;
        self.fresh = fresh;
    }

    /// The role the key currently plays, or `None` if never observed.
    pub fn role_of(&self, cid: &Cid) -> Option<Role> {
        self.colmap
            .get(cid.to_bytes())
            .map(|&c| self.role_for(c))
    }

    /// Visit every observed key with its current role.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Role)> + '_ {
        self.colmap
            .iter()
            .map(move |(k, &c)| (k.as_ref(), self.role_for(c)))
    }

    /// Number of observed keys.
    pub fn len(&self) -> usize {
        self.colmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colmap.is_empty()
    }

    /// Number of entries on the gray stack, stale ones included.
    pub fn gray_stack_len(&self) -> usize {
        self.grays.len()
    }

    fn role_for(&self, c: Color) -> Role {
        if c == self.gray {
            Role::Gray
        } else if c == self.black {
            Role::Black
        } else {
            Role::White
        }
    }
}

impl Default for Triset {
    fn default() -> Self {
        Self::new()
    }
}
