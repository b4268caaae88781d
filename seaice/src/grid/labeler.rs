//! Connected-region labeling.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Grid;

/// A cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellIndex {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

/// What a labeling pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSummary {
    /// Number of distinct regions relabeled.
    pub regions: usize,
    /// Total cells relabeled.
    pub cells: usize,
    /// Size of the largest region.
    pub largest_region: usize,
    /// Seed cell of each region, in discovery (row-major) order.
    pub seeds: Vec<CellIndex>,
}

/// Relabels every 4-connected region of mergeable cells with a target value.
///
/// A cell can join a region when `mergeable(v)` holds, `excluded(v)` does not,
/// and `v` is not already the target label. Cells already carrying the label
/// act as region boundaries, so two regions that touch only through an
/// existing label cell stay separate. Excluded cells are never modified.
///
/// Growth uses an explicit stack and a visited bitmap, so memory and time are
/// both O(rows × cols) regardless of region shape.
pub struct RegionLabeler<P, E> {
    mergeable: P,
    excluded: E,
    label: u8,
}

impl<P, E> fmt::Debug for RegionLabeler<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionLabeler")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<P, E> RegionLabeler<P, E>
where
    P: Fn(u8) -> bool,
    E: Fn(u8) -> bool,
{
    /// Creates a labeler.
    pub const fn new(mergeable: P, excluded: E, label: u8) -> Self {
        Self {
            mergeable,
            excluded,
            label,
        }
    }

    /// The value written into every labeled cell.
    #[must_use]
    pub const fn label(&self) -> u8 {
        self.label
    }

    fn joinable(&self, value: u8) -> bool {
        value != self.label && !(self.excluded)(value) && (self.mergeable)(value)
    }

    /// Labels `grid` in place and reports what changed.
    ///
    /// Always runs to completion; once the scan passes a cell its value is final.
    pub fn apply(&self, grid: &mut Grid) -> LabelSummary {
        let (rows, cols) = grid.dimensions();
        let label = self.label;
        let samples = grid.samples_mut();
        let mut visited = vec![false; samples.len()];
        let mut stack: Vec<usize> = Vec::new();
        let mut summary = LabelSummary::default();

        for seed in 0..samples.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            if !self.joinable(samples[seed]) {
                continue;
            }

            let mut size = 0;
            stack.push(seed);
            while let Some(cell) = stack.pop() {
                samples[cell] = label;
                size += 1;

                let (row, col) = (cell / cols, cell % cols);
                let down = (row + 1 < rows).then(|| cell + cols);
                let up = (row > 0).then(|| cell - cols);
                let right = (col + 1 < cols).then(|| cell + 1);
                let left = (col > 0).then(|| cell - 1);

                // Pushed in reverse so they pop as down, up, right, left.
                for next in [left, right, up, down].into_iter().flatten() {
                    if !visited[next] && self.joinable(samples[next]) {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }

            summary.regions += 1;
            summary.cells += size;
            summary.largest_region = summary.largest_region.max(size);
            summary.seeds.push(CellIndex {
                row: seed / cols,
                col: seed % cols,
            });
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[i32]]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    fn rows_of(grid: &Grid) -> Vec<Vec<u8>> {
        let (rows, _) = grid.dimensions();
        (0..rows).map(|r| grid.row(r).unwrap().to_vec()).collect()
    }

    fn hazard() -> RegionLabeler<impl Fn(u8) -> bool, impl Fn(u8) -> bool> {
        RegionLabeler::new(
            |v| v > 80 && v != 120,
            |v| v == 0 || v == 120,
            255,
        )
    }

    #[test]
    fn test_l_shape_and_isolated_cell() {
        let mut g = grid(&[&[85, 85, 0], &[0, 85, 0], &[0, 0, 85]]);
        let summary = hazard().apply(&mut g);

        assert_eq!(
            rows_of(&g),
            vec![vec![255, 255, 0], vec![0, 255, 0], vec![0, 0, 255]]
        );
        assert_eq!(summary.regions, 2);
        assert_eq!(summary.cells, 4);
        assert_eq!(summary.largest_region, 3);
        assert_eq!(
            summary.seeds,
            vec![CellIndex { row: 0, col: 0 }, CellIndex { row: 2, col: 2 }]
        );
    }

    #[test]
    fn test_excluded_cells_split_regions() {
        let mut g = grid(&[&[85, 0, 85, 0, 85]]);
        let summary = RegionLabeler::new(|v| v > 80, |v| v == 0, 255).apply(&mut g);

        assert_eq!(rows_of(&g), vec![vec![255, 0, 255, 0, 255]]);
        assert_eq!(summary.regions, 3);
        assert_eq!(summary.cells, 3);
    }

    #[test]
    fn test_single_cell_grid() {
        let mut g = grid(&[&[90]]);
        let summary = hazard().apply(&mut g);

        assert_eq!(g.get(0, 0), Ok(255));
        assert_eq!(summary.regions, 1);
        assert_eq!(summary.cells, 1);
    }

    #[test]
    fn test_existing_label_is_a_boundary() {
        // Two 90-regions touch only through a cell already labeled 255.
        let mut g = grid(&[&[90, 255, 90]]);
        let summary = hazard().apply(&mut g);

        assert_eq!(rows_of(&g), vec![vec![255, 255, 255]]);
        assert_eq!(summary.regions, 2);
        assert_eq!(summary.cells, 2);
    }

    #[test]
    fn test_non_mergeable_cells_untouched() {
        let mut g = grid(&[&[10, 85, 120], &[85, 40, 85], &[120, 85, 0]]);
        let before = g.clone();
        hazard().apply(&mut g);

        for row in 0..3 {
            for col in 0..3 {
                let original = before.get(row, col).unwrap();
                let now = g.get(row, col).unwrap();
                if original > 80 && original != 120 {
                    assert_eq!(now, 255);
                } else {
                    assert_eq!(now, original);
                }
            }
        }
    }

    #[test]
    fn test_diagonal_does_not_connect() {
        let mut g = grid(&[&[85, 0], &[0, 85]]);
        let summary = hazard().apply(&mut g);
        assert_eq!(summary.regions, 2);
    }

    #[test]
    fn test_large_region_does_not_recurse() {
        let mut g = Grid::filled(600, 600, 90).unwrap();
        let summary = hazard().apply(&mut g);

        assert_eq!(summary.regions, 1);
        assert_eq!(summary.cells, 360_000);
        assert_eq!(g.count(255), 360_000);
    }

    #[test]
    fn test_serpentine_region_is_one_region() {
        // Walls of 0 with alternating gaps force a single winding path.
        let mut rows = Vec::new();
        for r in 0..9 {
            let row: Vec<i32> = (0..9)
                .map(|c| match r % 4 {
                    1 if c != 8 => 0,
                    3 if c != 0 => 0,
                    _ => 90,
                })
                .collect();
            rows.push(row);
        }
        let mut g = Grid::from_rows(&rows).unwrap();
        let open = g.count(90);
        let summary = hazard().apply(&mut g);

        assert_eq!(summary.regions, 1);
        assert_eq!(summary.cells, open);
    }

    #[test]
    fn test_labeling_is_deterministic_and_idempotent() {
        let source = grid(&[
            &[85, 90, 0, 100, 100],
            &[0, 120, 0, 100, 0],
            &[95, 95, 95, 0, 81],
        ]);

        let mut first = source.clone();
        let mut second = source.clone();
        let a = hazard().apply(&mut first);
        let b = hazard().apply(&mut second);

        assert_eq!(first, second);
        assert_eq!(a, b);

        // A second pass over labeled output finds nothing new.
        let again = hazard().apply(&mut first);
        assert_eq!(again.regions, 0);
        assert_eq!(first, second);
    }
}
