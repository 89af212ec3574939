//! Entities on the shared grid, the arena that owns them, and the adjacency test.

use super::shape::{ShapeMatrix, Tag};

/// Integer grid position (x grows right, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Truncate a fractional position toward zero.
    pub fn truncate(x: f32, y: f32) -> Self {
        Self {
            x: x.trunc() as i32,
            y: y.trunc() as i32,
        }
    }
}

/// Stable identifier; never reused within one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Id carried by transient probes (the player collision cell).
    pub const PROBE: Self = Self(u64::MAX);
}

/// A positioned shape. Owns its matrix exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub origin: GridPos,
    pub shape: ShapeMatrix,
    pub tag: Tag,
    /// Ticks left before the next step.
    pub move_cooldown: u32,
}

impl Entity {
    /// Transient single-cell entity, e.g. the player for collision tests.
    pub fn probe(origin: GridPos, tag: Tag) -> Self {
        Self {
            id: EntityId::PROBE,
            origin,
            shape: ShapeMatrix::single_cell(),
            tag,
            move_cooldown: 0,
        }
    }

    #[inline]
    pub fn is_cluster(&self) -> bool {
        self.tag.is_cluster()
    }

    /// Filled cells in global coordinates.
    pub fn global_cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        self.shape
            .cells()
            .map(|(x, y)| GridPos::new(self.origin.x + x as i32, self.origin.y + y as i32))
    }

    /// Is the global cell `p` filled by this entity?
    #[inline]
    pub fn occupies(&self, p: GridPos) -> bool {
        self.shape.get_signed(
            i64::from(p.x) - i64::from(self.origin.x),
            i64::from(p.y) - i64::from(self.origin.y),
        )
    }

    /// Global footprint as (min corner, exclusive max corner) of the matrix.
    pub fn bounds(&self) -> (GridPos, GridPos) {
        (
            self.origin,
            GridPos::new(
                self.origin.x + self.shape.width() as i32,
                self.origin.y + self.shape.height() as i32,
            ),
        )
    }
}

const NEIGHBOURS_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// True iff some filled cell of `a` is orthogonally next to some filled cell of `b`.
/// Diagonal contact and overlap do not count.
pub fn adjacent(a: &Entity, b: &Entity) -> bool {
    // Bounding boxes must at least touch for any cell pair to be one step apart.
    let (a_min, a_max) = a.bounds();
    let (b_min, b_max) = b.bounds();
    if a_max.x < b_min.x || b_max.x < a_min.x || a_max.y < b_min.y || b_max.y < a_min.y {
        return false;
    }
    a.global_cells().any(|p| {
        NEIGHBOURS_4
            .iter()
            .any(|&(dx, dy)| b.occupies(GridPos::new(p.x + dx, p.y + dy)))
    })
}

#[derive(Debug, Clone)]
struct Slot {
    entity: Entity,
    alive: bool,
}

/// Ordered entity storage with stable ids. Removal only clears the alive flag;
/// `compact` drops dead slots and keeps the relative order of survivors.
#[derive(Debug, Clone, Default)]
pub struct EntityArena {
    slots: Vec<Slot>,
    next_id: u64,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entity at the end of the order.
    pub fn spawn(&mut self, origin: GridPos, shape: ShapeMatrix, tag: Tag) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            entity: Entity {
                id,
                origin,
                shape,
                tag,
                move_cooldown: 0,
            },
            alive: true,
        });
        id
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter(|s| s.alive).map(|s| &s.entity)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots
            .iter_mut()
            .filter(|s| s.alive)
            .map(|s| &mut s.entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.iter().find(|e| e.id == id)
    }

    /// Slot count including dead slots not yet compacted.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&Entity> {
        self.slots
            .get(index)
            .filter(|s| s.alive)
            .map(|s| &s.entity)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.slots
            .get_mut(index)
            .filter(|s| s.alive)
            .map(|s| &mut s.entity)
    }

    pub(crate) fn kill(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.alive = false;
        }
    }

    /// First live slot at or after `from`.
    pub(crate) fn next_alive(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|&i| self.slots[i].alive)
    }

    /// Drop dead slots.
    pub fn compact(&mut self) {
        self.slots.retain(|s| s.alive);
    }
}
