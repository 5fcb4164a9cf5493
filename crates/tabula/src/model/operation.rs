//! Structural edit operations and the index relocation they imply.
//!
//! An [`Operation`] is recorded by a `begin_*` call and consumed by the
//! matching `end_*` call. At that point every persistent index of the model
//! is passed through [`Operation::relocate`], which computes its new
//! position from its position *before* the edit.

use super::index::ModelIndex;

/// What kind of structural edit an operation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Rows or columns are inserted.
    Insert,
    /// Rows or columns are removed.
    Delete,
    /// A contiguous range of rows or columns changes position or parent.
    Move,
    /// The whole model is invalidated.
    Reset,
}

/// Which axis an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Row insert/delete/move.
    Row,
    /// Column insert/delete/move.
    Column,
}

impl Direction {
    /// The coordinate of `index` along this axis.
    #[inline]
    pub fn coordinate(self, index: &ModelIndex) -> usize {
        match self {
            Direction::Row => index.row(),
            Direction::Column => index.column(),
        }
    }

    /// `index` with its coordinate along this axis replaced.
    fn place(self, index: &ModelIndex, coordinate: usize, parent: ModelIndex) -> ModelIndex {
        match self {
            Direction::Row => index.relocated(coordinate, index.column(), parent),
            Direction::Column => index.relocated(index.row(), coordinate, parent),
        }
    }
}

/// A pending structural edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The kind of edit.
    pub kind: OperationKind,
    /// The axis the edit works on.
    pub direction: Direction,
    /// Parent of the affected range.
    pub source_parent: ModelIndex,
    /// First affected row/column.
    pub first: usize,
    /// Last affected row/column (inclusive).
    pub last: usize,
    /// Destination parent of a move; the source parent otherwise.
    pub target_parent: ModelIndex,
    /// Position the first moved item ends up at; `first` otherwise.
    pub target: usize,
}

/// Where an item ends up, relative to its own parent level.
enum Placement {
    Keep,
    Remove,
    Shift(usize),
    IntoTarget(usize),
}

impl Operation {
    /// Describes an insertion of `first..=last` under `parent`.
    pub fn insert(direction: Direction, parent: ModelIndex, first: usize, last: usize) -> Self {
        Self::ranged(OperationKind::Insert, direction, parent, first, last)
    }

    /// Describes a removal of `first..=last` under `parent`.
    pub fn delete(direction: Direction, parent: ModelIndex, first: usize, last: usize) -> Self {
        Self::ranged(OperationKind::Delete, direction, parent, first, last)
    }

    /// Describes moving `first..=last` under `source_parent` so that `first`
    /// ends up at `target` under `target_parent`.
    pub fn moving(
        direction: Direction,
        source_parent: ModelIndex,
        first: usize,
        last: usize,
        target_parent: ModelIndex,
        target: usize,
    ) -> Self {
        Self {
            kind: OperationKind::Move,
            direction,
            source_parent,
            first,
            last,
            target_parent,
            target,
        }
    }

    /// Describes a full reset.
    pub fn reset() -> Self {
        Self::ranged(
            OperationKind::Reset,
            Direction::Row,
            ModelIndex::invalid(),
            0,
            0,
        )
    }

    fn ranged(
        kind: OperationKind,
        direction: Direction,
        parent: ModelIndex,
        first: usize,
        last: usize,
    ) -> Self {
        Self {
            kind,
            direction,
            target_parent: parent.clone(),
            source_parent: parent,
            first,
            last,
            target: first,
        }
    }

    /// Number of rows/columns affected.
    #[inline]
    pub fn count(&self) -> usize {
        self.last - self.first + 1
    }

    /// `true` for a move whose source and target parents are the same item.
    #[inline]
    pub fn is_move_within(&self) -> bool {
        self.source_parent == self.target_parent
    }

    /// `true` if this operation leaves every index where it is.
    pub fn is_noop(&self) -> bool {
        self.kind == OperationKind::Move && self.is_move_within() && self.first == self.target
    }

    /// The half-open range of coordinates a within-parent move touches.
    pub fn work_area(&self) -> std::ops::Range<usize> {
        let start = self.first.min(self.target);
        let end = (self.last + 1).max(self.target + self.count());
        start..end
    }

    /// Where `index` (a position before the edit) lives after the edit.
    ///
    /// Returns `None` if the item is removed. For row edits the parent chain
    /// is relocated first, so descendants of shifted, moved or removed rows
    /// follow them. Column edits only touch cells directly under
    /// `source_parent` (and `target_parent` for moves): children hang off
    /// their parent's row, which a column edit never changes.
    pub fn relocate(&self, index: &ModelIndex) -> Option<ModelIndex> {
        if !index.is_valid() {
            return Some(ModelIndex::invalid());
        }
        if self.kind == OperationKind::Reset {
            return None;
        }

        let parent = index.parent();
        let new_parent = self.relocate_parent(&parent)?;
        let coordinate = self.direction.coordinate(index);

        match self.placement(&parent, coordinate) {
            Placement::Keep if new_parent == parent => Some(index.clone()),
            Placement::Keep => Some(self.direction.place(index, coordinate, new_parent)),
            Placement::Remove => None,
            Placement::Shift(coordinate) => Some(self.direction.place(index, coordinate, new_parent)),
            Placement::IntoTarget(coordinate) => {
                let target_parent = self.relocate_parent(&self.target_parent)?;
                Some(self.direction.place(index, coordinate, target_parent))
            }
        }
    }

    fn relocate_parent(&self, parent: &ModelIndex) -> Option<ModelIndex> {
        match self.direction {
            Direction::Row => self.relocate(parent),
            Direction::Column => Some(parent.clone()),
        }
    }

    /// Placement of an item at `coordinate` directly under `parent`.
    fn placement(&self, parent: &ModelIndex, coordinate: usize) -> Placement {
        let in_range = (self.first..=self.last).contains(&coordinate);
        let count = self.count();

        match self.kind {
            OperationKind::Reset => Placement::Remove,
            OperationKind::Insert => {
                if *parent == self.source_parent && coordinate >= self.first {
                    Placement::Shift(coordinate + count)
                } else {
                    Placement::Keep
                }
            }
            OperationKind::Delete => {
                if *parent != self.source_parent {
                    Placement::Keep
                } else if in_range {
                    Placement::Remove
                } else if coordinate > self.last {
                    Placement::Shift(coordinate - count)
                } else {
                    Placement::Keep
                }
            }
            OperationKind::Move if self.is_noop() => Placement::Keep,
            OperationKind::Move if self.is_move_within() => {
                if *parent != self.source_parent {
                    return Placement::Keep;
                }
                let moving_down = self.target > self.first;
                let work_area = self.work_area();
                if in_range {
                    Placement::Shift(self.target + (coordinate - self.first))
                } else if moving_down && coordinate > self.last && coordinate < work_area.end {
                    Placement::Shift(coordinate - count)
                } else if !moving_down && coordinate >= work_area.start && coordinate < self.first {
                    Placement::Shift(coordinate + count)
                } else {
                    Placement::Keep
                }
            }
            OperationKind::Move => {
                if *parent == self.source_parent {
                    if in_range {
                        Placement::IntoTarget(self.target + (coordinate - self.first))
                    } else if coordinate > self.last {
                        Placement::Shift(coordinate - count)
                    } else {
                        Placement::Keep
                    }
                } else if *parent == self.target_parent && coordinate >= self.target {
                    Placement::Shift(coordinate + count)
                } else {
                    Placement::Keep
                }
            }
        }
    }
}
