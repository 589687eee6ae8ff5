//! Cell occupancy shared by the regular and the contingent scheduler.
//!
//! A cell is one timeslot (regular term) or one (day, period) pair
//! (contingent days). Each cell has a room pool sorted by capacity and the
//! week used to resolve faculty handovers. Occupants are checked against
//! the [`ConflictModel`], so a cell never holds two conflicting sections.

use crate::conflict::ConflictModel;

/// A room of a cell pool: (room index, capacity).
pub(crate) type PoolRoom = (usize, u32);

#[derive(Debug, Clone)]
pub(crate) struct Occupancy<'m> {
    model: &'m ConflictModel,
    cell_week: Vec<u32>,
    cell_pool: Vec<usize>,
    pools: Vec<Vec<PoolRoom>>,
    /// Per cell: (section, room index).
    occupants: Vec<Vec<(usize, usize)>>,
    /// Per section: occupied cells.
    placed: Vec<Vec<usize>>,
}

impl<'m> Occupancy<'m> {
    /// `cell_pool[c]` indexes into `pools`; pools must be capacity ascending.
    pub(crate) fn new(
        model: &'m ConflictModel,
        cell_week: Vec<u32>,
        cell_pool: Vec<usize>,
        pools: Vec<Vec<PoolRoom>>,
    ) -> Self {
        let cells = cell_week.len();
        Self {
            model,
            cell_week,
            cell_pool,
            pools,
            occupants: vec![Vec::new(); cells],
            placed: vec![Vec::new(); model.section_count()],
        }
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.cell_week.len()
    }

    pub(crate) fn model(&self) -> &'m ConflictModel {
        self.model
    }

    /// Sections in cell `c` with their rooms.
    pub(crate) fn occupants(&self, c: usize) -> &[(usize, usize)] {
        &self.occupants[c]
    }

    /// Cells occupied by section `s`.
    pub(crate) fn placed(&self, s: usize) -> &[usize] {
        &self.placed[s]
    }

    pub(crate) fn load(&self, c: usize) -> usize {
        self.occupants[c].len()
    }

    pub(crate) fn hosts(&self, s: usize, c: usize) -> bool {
        self.occupants[c].iter().any(|&(o, _)| o == s)
    }

    /// Occupants of `c` that conflict with `s`.
    pub(crate) fn blockers(&self, s: usize, c: usize) -> Vec<usize> {
        let week = self.cell_week[c];
        self.occupants[c]
            .iter()
            .filter(|&&(o, _)| self.model.conflicts(s, o, week))
            .map(|&(o, _)| o)
            .collect()
    }

    /// Smallest free room of `c` that seats section `s`.
    pub(crate) fn free_room(&self, s: usize, c: usize) -> Option<usize> {
        let size = self.model.size(s);
        self.pools[self.cell_pool[c]]
            .iter()
            .filter(|&&(_, cap)| cap as usize >= size)
            .map(|&(r, _)| r)
            .find(|&r| !self.occupants[c].iter().any(|&(_, used)| used == r))
    }

    /// Whether any room of `c` could ever seat section `s`.
    pub(crate) fn fits(&self, s: usize, c: usize) -> bool {
        let size = self.model.size(s);
        self.pools[self.cell_pool[c]]
            .last()
            .is_some_and(|&(_, cap)| cap as usize >= size)
    }

    /// Room for `s` in `c` if the cell is conflict-free for it.
    pub(crate) fn open_room(&self, s: usize, c: usize) -> Option<usize> {
        if self.hosts(s, c) || !self.blockers(s, c).is_empty() {
            return None;
        }
        self.free_room(s, c)
    }

    /// Occupants whose removal could open `c` for `s`: the single
    /// conflicting occupant, or, when nothing conflicts but no room is
    /// free, every occupant holding a room that seats `s`.
    pub(crate) fn displaceable(&self, s: usize, c: usize) -> Vec<usize> {
        if self.hosts(s, c) {
            return Vec::new();
        }
        let blockers = self.blockers(s, c);
        match blockers.len() {
            0 => {
                let size = self.model.size(s);
                let pool = &self.pools[self.cell_pool[c]];
                self.occupants[c]
                    .iter()
                    .filter(|&&(_, r)| {
                        pool.iter()
                            .any(|&(pr, cap)| pr == r && cap as usize >= size)
                    })
                    .map(|&(o, _)| o)
                    .collect()
            }
            1 => blockers,
            _ => Vec::new(),
        }
    }

    pub(crate) fn place(&mut self, s: usize, c: usize, room: usize) {
        self.occupants[c].push((s, room));
        self.placed[s].push(c);
    }

    /// Removes `s` from `c`, returning the room it held.
    pub(crate) fn remove(&mut self, s: usize, c: usize) -> Option<usize> {
        let i = self.occupants[c].iter().position(|&(o, _)| o == s)?;
        let (_, room) = self.occupants[c].remove(i);
        if let Some(j) = self.placed[s].iter().position(|&x| x == c) {
            self.placed[s].swap_remove(j);
        }
        Some(room)
    }
}
