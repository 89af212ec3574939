//! Cluster algebra: fusing touching entities, clearing saturated lines,
//! and re-emitting catalog-shaped fragments.

use super::entity::{Entity, EntityArena, EntityId, GridPos, adjacent};
use super::shape::{ShapeCatalog, ShapeKind, ShapeMatrix, Tag};

/// Union of two entities on a shared grid. Returns the box's min corner and the OR'd matrix.
pub fn merge(a: &Entity, b: &Entity) -> (GridPos, ShapeMatrix) {
    let (a_min, a_max) = a.bounds();
    let (b_min, b_max) = b.bounds();
    let min = GridPos::new(a_min.x.min(b_min.x), a_min.y.min(b_min.y));
    let max = GridPos::new(a_max.x.max(b_max.x), a_max.y.max(b_max.y));
    let mut shape = ShapeMatrix::blank((max.x - min.x) as usize, (max.y - min.y) as usize);
    for src in [a, b] {
        let ox = (src.origin.x - min.x) as usize;
        let oy = (src.origin.y - min.y) as usize;
        for (x, y) in src.shape.cells() {
            shape.set(ox + x, oy + y, true);
        }
    }
    (min, shape)
}

/// One fusion performed by [`merge_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRecord {
    pub absorbed: (EntityId, EntityId),
    pub result: EntityId,
    pub origin: GridPos,
}

/// Scan the arena in order and fuse touching pairs into clusters.
///
/// For the entity under the cursor, the first later entity it touches is merged with it;
/// both are removed and the cluster goes to the end. The cursor then stays put, so it now
/// points at whatever entity follows, and only advances when no partner is found.
pub fn merge_pass(arena: &mut EntityArena) -> Vec<MergeRecord> {
    let mut records = Vec::new();
    let mut cursor = arena.next_alive(0);
    while let Some(i) = cursor {
        let partner = arena.slot(i).and_then(|current| {
            (i + 1..arena.slot_count()).find(|&j| {
                arena
                    .slot(j)
                    .is_some_and(|other| adjacent(current, other))
            })
        });
        let Some(j) = partner else {
            cursor = arena.next_alive(i + 1);
            continue;
        };
        let (Some(a), Some(b)) = (arena.slot(i), arena.slot(j)) else {
            cursor = arena.next_alive(i + 1);
            continue;
        };
        let absorbed = (a.id, b.id);
        let (origin, shape) = merge(a, b);
        log::debug!(
            "merge {:?} + {:?} -> {}x{} cluster of {} cells at ({}, {})",
            absorbed.0,
            absorbed.1,
            shape.width(),
            shape.height(),
            shape.filled_count(),
            origin.x,
            origin.y
        );
        arena.kill(i);
        arena.kill(j);
        let result = arena.spawn(origin, shape, Tag::Cluster);
        records.push(MergeRecord {
            absorbed,
            result,
            origin,
        });
        cursor = arena.next_alive(i);
    }
    arena.compact();
    records
}

/// Saturated rows and columns of a matrix, judged on the unmodified matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaturatedLines {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl SaturatedLines {
    pub fn find(shape: &ShapeMatrix, threshold: usize) -> Self {
        Self {
            rows: (0..shape.height())
                .filter(|&y| shape.row_count(y) >= threshold)
                .collect(),
            cols: (0..shape.width())
                .filter(|&x| shape.column_count(x) >= threshold)
                .collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.rows.len() + self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Outcome of a successful line clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClear {
    pub lines: usize,
    /// Reduced matrix; `None` when every row or column was removed.
    pub residual: Option<ShapeMatrix>,
}

/// Remove all saturated rows and columns at once. `None` if nothing is saturated.
pub fn clear_lines(shape: &ShapeMatrix, threshold: usize) -> Option<LineClear> {
    let saturated = SaturatedLines::find(shape, threshold);
    if saturated.is_empty() {
        return None;
    }
    Some(LineClear {
        lines: saturated.count(),
        residual: shape.without_lines(&saturated.rows, &saturated.cols),
    })
}

/// 4-connected components of the filled cells, each in discovery order.
pub fn connected_components(shape: &ShapeMatrix) -> Vec<Vec<(usize, usize)>> {
    let (w, h) = (shape.width(), shape.height());
    let mut visited = vec![false; w * h];
    let mut components = Vec::new();
    for (sx, sy) in shape.cells() {
        if visited[sy * w + sx] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![(sx, sy)];
        visited[sy * w + sx] = true;
        while let Some((x, y)) = stack.pop() {
            component.push((x, y));
            let neighbours = [
                (x.checked_add(1), Some(y)),
                (x.checked_sub(1), Some(y)),
                (Some(x), y.checked_add(1)),
                (Some(x), y.checked_sub(1)),
            ];
            for (nx, ny) in neighbours {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                if nx < w && ny < h && shape.get(nx, ny) && !visited[ny * w + nx] {
                    visited[ny * w + nx] = true;
                    stack.push((nx, ny));
                }
            }
        }
        components.push(component);
    }
    components
}

/// A four-cell component that matched a catalog entry exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Local offset of the fragment's box inside the source matrix.
    pub offset: (usize, usize),
    pub shape: ShapeMatrix,
    pub kind: ShapeKind,
}

/// Split off every catalog-matching tetromino component.
/// Returns the residual matrix (same dimensions, extracted cells cleared) and the fragments.
pub fn extract_fragments(
    shape: &ShapeMatrix,
    catalog: &ShapeCatalog,
) -> (ShapeMatrix, Vec<Fragment>) {
    let mut residual = shape.blank_like();
    let mut fragments = Vec::new();
    for component in connected_components(shape) {
        if component.len() == 4 {
            if let Some(fragment) = catalog_fragment(&component, catalog) {
                fragments.push(fragment);
                continue;
            }
        }
        for &(x, y) in &component {
            residual.set(x, y, true);
        }
    }
    (residual, fragments)
}

fn catalog_fragment(component: &[(usize, usize)], catalog: &ShapeCatalog) -> Option<Fragment> {
    let (Some(min_x), Some(min_y)) = (
        component.iter().map(|&(x, _)| x).min(),
        component.iter().map(|&(_, y)| y).min(),
    ) else {
        return None;
    };
    let Ok(normalized) = ShapeMatrix::from_cells(component) else {
        return None;
    };
    let kind = catalog.match_shape(&normalized)?;
    Some(Fragment {
        offset: (min_x, min_y),
        shape: normalized,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shape(rows: &[&str]) -> ShapeMatrix {
        ShapeMatrix::parse(rows).unwrap()
    }

    #[test]
    fn test_merge_two_horizontal_bars() {
        let mut arena = EntityArena::new();
        arena.spawn(GridPos::new(0, 0), shape(&["####"]), Tag::Shape(ShapeKind::I));
        arena.spawn(GridPos::new(4, 0), shape(&["####"]), Tag::Shape(ShapeKind::I));
        let records = merge_pass(&mut arena);
        assert_eq!(records.len(), 1);
        assert_eq!(arena.len(), 1);
        let cluster = arena.iter().next().unwrap();
        assert_eq!(cluster.origin, GridPos::new(0, 0));
        assert_eq!(cluster.shape, shape(&["########"]));
        assert_eq!(cluster.tag, Tag::Cluster);
        assert_eq!(cluster.move_cooldown, 0);
    }

    #[test]
    fn test_merge_offsets_into_union_box() {
        let a = Entity {
            id: EntityId(0),
            origin: GridPos::new(2, 1),
            shape: shape(&["##", "##"]),
            tag: Tag::Shape(ShapeKind::O),
            move_cooldown: 0,
        };
        let b = Entity {
            id: EntityId(1),
            origin: GridPos::new(0, 3),
            shape: shape(&["###", "..#"]),
            tag: Tag::Shape(ShapeKind::J),
            move_cooldown: 0,
        };
        let (origin, merged) = merge(&a, &b);
        assert_eq!(origin, GridPos::new(0, 1));
        assert_eq!(merged, shape(&["..##", "..##", "###.", "..#."]));
    }

    #[test]
    fn test_merge_pass_absorbs_chain_in_one_tick() {
        // a touches b, c touches b from the other side; the cluster of a+b is appended
        // and later meets c, so everything fuses within a single pass.
        let mut arena = EntityArena::new();
        arena.spawn(GridPos::new(0, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        arena.spawn(GridPos::new(1, 0), shape(&["#"]), Tag::Shape(ShapeKind::O));
        arena.spawn(GridPos::new(2, 0), shape(&["#"]), Tag::Shape(ShapeKind::T));
        let records = merge_pass(&mut arena);
        assert_eq!(records.len(), 2);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.iter().next().unwrap().shape, shape(&["###"]));
    }

    #[test]
    fn test_merge_pass_keeps_cursor_after_merge() {
        // Slots: [A, B, C, D]. A touches C only; B touches D only.
        // Literal list semantics: A+C merge -> [B, D, AC]; cursor 0 now sees B, which merges
        // with D -> [AC, BD]. AC and BD are far apart, so two clusters remain.
        let mut arena = EntityArena::new();
        let a = arena.spawn(GridPos::new(0, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        let b = arena.spawn(GridPos::new(10, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        let c = arena.spawn(GridPos::new(1, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        let d = arena.spawn(GridPos::new(11, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        let records = merge_pass(&mut arena);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].absorbed, (a, c));
        assert_eq!(records[1].absorbed, (b, d));
        let origins: Vec<_> = arena.iter().map(|e| e.origin).collect();
        assert_eq!(origins, vec![GridPos::new(0, 0), GridPos::new(10, 0)]);
    }

    #[test]
    fn test_merge_pass_ignores_separated_entities() {
        let mut arena = EntityArena::new();
        arena.spawn(GridPos::new(0, 0), shape(&["#"]), Tag::Shape(ShapeKind::I));
        arena.spawn(GridPos::new(1, 1), shape(&["#"]), Tag::Shape(ShapeKind::I));
        assert!(merge_pass(&mut arena).is_empty());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_single_full_row_clears_completely() {
        let row = shape(&["##########"]);
        let clear = clear_lines(&row, 10).unwrap();
        assert_eq!(clear.lines, 1);
        assert_eq!(clear.residual, None);
    }

    #[test]
    fn test_nothing_saturated_is_none() {
        assert_eq!(clear_lines(&shape(&["#########"]), 10), None);
    }

    #[test]
    fn test_row_and_column_use_original_counts() {
        // Row 1 is full (10). Column 0 has 10 cells only when row 1 is counted.
        let mut m = ShapeMatrix::new(10, 10).unwrap();
        for x in 0..10 {
            m.set(x, 1, true);
        }
        for y in 0..10 {
            m.set(0, y, true);
        }
        m.set(5, 5, true);
        let saturated = SaturatedLines::find(&m, 10);
        assert_eq!(saturated.rows, vec![1]);
        assert_eq!(saturated.cols, vec![0]);
        let clear = clear_lines(&m, 10).unwrap();
        assert_eq!(clear.lines, 2);
        let residual = clear.residual.unwrap();
        assert_eq!((residual.width(), residual.height()), (9, 9));
        assert_eq!(residual.filled_count(), 1);
        // (5, 5) shifts left by one column and up by one row.
        assert!(residual.get(4, 4));
    }

    #[test]
    fn test_components_are_four_connected() {
        let m = shape(&["#.#", ".#.", "##."]);
        let mut sizes: Vec<_> = connected_components(&m).iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 1, 3]);
    }

    #[test]
    fn test_extract_matching_o_block() {
        let m = shape(&["....", ".##.", ".##."]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, ShapeKind::O);
        assert_eq!(fragments[0].offset, (1, 1));
        assert!(residual.is_blank());
        assert_eq!((residual.width(), residual.height()), (4, 3));
    }

    #[test]
    fn test_five_cell_component_stays() {
        let m = shape(&["#####"]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert!(fragments.is_empty());
        assert_eq!(residual, m);
    }

    #[test]
    fn test_rotated_tetromino_is_not_extracted() {
        let m = shape(&["#.", "#.", "#.", "#."]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert!(fragments.is_empty());
        assert_eq!(residual, m);
    }

    #[test]
    fn test_small_components_are_retained() {
        let m = shape(&["#..##", "....."]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert!(fragments.is_empty());
        assert_eq!(residual.filled_count(), 3);
    }

    #[test]
    fn test_mixed_components() {
        // Left: T tetromino (extracted). Right: 5-cell bar (kept).
        let m = shape(&["###.#####", ".#......."]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, ShapeKind::T);
        assert_eq!(fragments[0].offset, (0, 0));
        assert_eq!(residual, shape(&["....#####", "........."]));
    }

    #[test]
    fn test_inner_fragment_keeps_local_offset() {
        // Z at columns 2..5, rows 1..3; the vertical bar on the left is a turned I and stays.
        let m = shape(&["#.....", "#..##.", "#.##..", "#....."]);
        let (residual, fragments) = extract_fragments(&m, ShapeCatalog::standard());
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].kind, ShapeKind::Z);
        assert_eq!(fragments[0].offset, (2, 1));
        assert_eq!(fragments[0].shape, ShapeKind::Z.matrix());
        assert_eq!(residual, shape(&["#.....", "#.....", "#.....", "#....."]));
    }

    fn arb_placed() -> impl Strategy<Value = Entity> {
        (0usize..7, 0u8..4, -6i32..6, -6i32..6).prop_map(|(k, turns, x, y)| Entity {
            id: EntityId(0),
            origin: GridPos::new(x, y),
            shape: ShapeKind::ALL[k].matrix().rotated(turns),
            tag: Tag::Shape(ShapeKind::ALL[k]),
            move_cooldown: 0,
        })
    }

    proptest! {
        #[test]
        fn prop_merge_conserves_disjoint_cells(a in arb_placed(), b in arb_placed()) {
            let overlap = a.global_cells().filter(|p| b.occupies(*p)).count();
            let (origin, merged) = merge(&a, &b);
            prop_assert_eq!(
                merged.filled_count(),
                a.shape.filled_count() + b.shape.filled_count() - overlap
            );
            // Every source cell is present at the same global position.
            for p in a.global_cells().chain(b.global_cells()) {
                prop_assert!(merged.get((p.x - origin.x) as usize, (p.y - origin.y) as usize));
            }
        }
    }
}
