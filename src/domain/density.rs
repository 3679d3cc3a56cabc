//! Uniform-grid binning of shops into density cells.
//!
//! Cell `(col, row)` covers `[lon_edge(col), lon_edge(col + 1))` by
//! `[lat_edge(row), lat_edge(row + 1))`. Both scans below share these edges, so
//! a point on a shared boundary lands in exactly one cell, the one to its
//! east/north, and the two scans always agree.

use crate::domain::model::{BoundingBox, DensityCell, GeoPoint, GridSpec, RamenShop};
use std::collections::BTreeMap;

struct CellLayout {
    bounds: BoundingBox,
    grid: GridSpec,
    cell_width: f64,
    cell_height: f64,
}

impl CellLayout {
    fn new(bounds: &BoundingBox, grid: GridSpec) -> Self {
        Self {
            bounds: *bounds,
            grid,
            cell_width: bounds.width() / grid.cols() as f64,
            cell_height: bounds.height() / grid.rows() as f64,
        }
    }

    fn lon_edge(&self, col: u32) -> f64 {
        if col >= self.grid.cols() {
            return self.bounds.max_lon();
        }
        (self.bounds.min_lon() + col as f64 * self.cell_width).min(self.bounds.max_lon())
    }

    fn lat_edge(&self, row: u32) -> f64 {
        if row >= self.grid.rows() {
            return self.bounds.max_lat();
        }
        (self.bounds.min_lat() + row as f64 * self.cell_height).min(self.bounds.max_lat())
    }

    fn cell_contains(&self, col: u32, row: u32, point: &GeoPoint) -> bool {
        point.longitude() >= self.lon_edge(col)
            && point.longitude() < self.lon_edge(col + 1)
            && point.latitude() >= self.lat_edge(row)
            && point.latitude() < self.lat_edge(row + 1)
    }

    fn cell_center(&self, col: u32, row: u32) -> GeoPoint {
        GeoPoint::new(
            self.lon_edge(col) + self.cell_width / 2.0,
            self.lat_edge(row) + self.cell_height / 2.0,
        )
    }

    /// Grid position of `point`, or `None` outside the box.
    fn locate(&self, point: &GeoPoint) -> Option<(u32, u32)> {
        if !self.bounds.contains(point) {
            return None;
        }

        let col = Self::snap(
            point.longitude(),
            (point.longitude() - self.bounds.min_lon()) / self.cell_width,
            self.grid.cols(),
            |c| self.lon_edge(c),
        );
        let row = Self::snap(
            point.latitude(),
            (point.latitude() - self.bounds.min_lat()) / self.cell_height,
            self.grid.rows(),
            |r| self.lat_edge(r),
        );
        Some((col, row))
    }

    /// Starts from the arithmetic estimate and walks until `value` sits in
    /// `[edge(i), edge(i + 1))`; corrects rounding right at the edges.
    fn snap(value: f64, estimate: f64, count: u32, edge: impl Fn(u32) -> f64) -> u32 {
        let mut index = if estimate.is_finite() && estimate > 0.0 {
            (estimate.floor() as u64).min(count as u64 - 1) as u32
        } else {
            0
        };

        while index > 0 && value < edge(index) {
            index -= 1;
        }
        while index + 1 < count && value >= edge(index + 1) {
            index += 1;
        }
        index
    }

    fn cell(&self, col: u32, row: u32, count: u32) -> DensityCell {
        DensityCell::new(col, row, self.cell_center(col, row), count)
    }
}

/// Counts shops per grid cell in one pass over the shops.
///
/// Only non-empty cells are returned, ordered by column then row. Shops
/// outside `bounds` are ignored.
pub fn aggregate(shops: &[RamenShop], bounds: &BoundingBox, grid: GridSpec) -> Vec<DensityCell> {
    let layout = CellLayout::new(bounds, grid);
    // 只記錄有店的格子，記憶體與店數成正比而非格數
    let mut counts: BTreeMap<(u32, u32), u32> = BTreeMap::new();

    for shop in shops {
        if let Some(cell) = layout.locate(&shop.location()) {
            *counts.entry(cell).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|((col, row), count)| layout.cell(col, row, count))
        .collect()
}

/// Cell-by-cell scan, `O(cols * rows * shops)`. Produces the same output as
/// [`aggregate`].
pub fn aggregate_by_scan(
    shops: &[RamenShop],
    bounds: &BoundingBox,
    grid: GridSpec,
) -> Vec<DensityCell> {
    let layout = CellLayout::new(bounds, grid);
    let mut cells = Vec::new();

    for col in 0..grid.cols() {
        for row in 0..grid.rows() {
            let count = shops
                .iter()
                .filter(|shop| layout.cell_contains(col, row, &shop.location()))
                .count() as u32;

            if count > 0 {
                cells.push(layout.cell(col, row, count));
            }
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::tile_to_bounding_box;
    use std::collections::HashSet;

    fn shop_at(id: usize, lon: f64, lat: f64) -> RamenShop {
        RamenShop::new(
            id.to_string(),
            format!("Shop {}", id),
            GeoPoint::new(lon, lat),
            None,
            None,
        )
    }

    /// Deterministic points spread over (and slightly beyond) `bounds`.
    fn scattered_shops(bounds: &BoundingBox, n: usize, seed: u64) -> Vec<RamenShop> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        (0..n)
            .map(|i| {
                let lon = bounds.min_lon() + (next() * 1.2 - 0.1) * bounds.width();
                let lat = bounds.min_lat() + (next() * 1.2 - 0.1) * bounds.height();
                shop_at(i, lon, lat)
            })
            .collect()
    }

    fn unit_box() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    #[test]
    fn test_counts_and_centers() {
        let shops = vec![
            shop_at(1, 0.5, 0.5),
            shop_at(2, 0.7, 0.2),
            shop_at(3, 9.9, 9.9),
        ];

        let cells = aggregate(&shops, &unit_box(), GridSpec::default());

        assert_eq!(cells.len(), 2);
        assert_eq!((cells[0].col(), cells[0].row(), cells[0].count()), (0, 0, 2));
        assert_eq!(cells[0].center(), GeoPoint::new(0.5, 0.5));
        assert_eq!((cells[1].col(), cells[1].row(), cells[1].count()), (9, 9, 1));
        assert_eq!(cells[1].center(), GeoPoint::new(9.5, 9.5));
    }

    #[test]
    fn test_no_shops_gives_no_cells() {
        assert!(aggregate(&[], &unit_box(), GridSpec::default()).is_empty());
    }

    #[test]
    fn test_boundary_point_belongs_to_east_north_cell() {
        let shops = vec![shop_at(1, 3.0, 5.0)];

        let cells = aggregate(&shops, &unit_box(), GridSpec::default());

        assert_eq!(cells.len(), 1);
        assert_eq!((cells[0].col(), cells[0].row(), cells[0].count()), (3, 5, 1));
    }

    #[test]
    fn test_east_and_north_box_edges_are_outside() {
        let shops = vec![
            shop_at(1, 10.0, 5.0),
            shop_at(2, 5.0, 10.0),
            shop_at(3, 0.0, 0.0),
        ];

        let cells = aggregate(&shops, &unit_box(), GridSpec::default());

        assert_eq!(cells.len(), 1);
        assert_eq!((cells[0].col(), cells[0].row()), (0, 0));
    }

    #[test]
    fn test_every_shared_edge_counts_once() {
        let bounds = tile_to_bounding_box(15, 29100, 12897).unwrap();
        let grid = GridSpec::new(7, 9).unwrap();
        let layout = CellLayout::new(&bounds, grid);

        let mut shops = Vec::new();
        for col in 0..grid.cols() {
            for row in 0..grid.rows() {
                shops.push(shop_at(shops.len(), layout.lon_edge(col), layout.lat_edge(row)));
            }
        }

        let cells = aggregate(&shops, &bounds, grid);

        assert_eq!(cells.len(), (grid.cols() * grid.rows()) as usize);
        assert!(cells.iter().all(|c| c.count() == 1));
        assert_eq!(cells, aggregate_by_scan(&shops, &bounds, grid));
    }

    #[test]
    fn test_total_count_matches_shops_inside_box() {
        let bounds = BoundingBox::new(139.69, 35.72, 139.73, 35.74).unwrap();

        for (seed, grid) in [(1, GridSpec::default()), (2, GridSpec::new(3, 17).unwrap())] {
            let shops = scattered_shops(&bounds, 2000, seed);
            let inside = shops
                .iter()
                .filter(|s| bounds.contains(&s.location()))
                .count();

            let cells = aggregate(&shops, &bounds, grid);
            let total: u32 = cells.iter().map(|c| c.count()).sum();

            assert!(inside < shops.len());
            assert_eq!(total as usize, inside);
        }
    }

    #[test]
    fn test_cells_are_unique_per_position() {
        let bounds = unit_box();
        let shops = scattered_shops(&bounds, 500, 3);

        let cells = aggregate(&shops, &bounds, GridSpec::default());
        let positions: HashSet<(u32, u32)> = cells.iter().map(|c| (c.col(), c.row())).collect();

        assert_eq!(positions.len(), cells.len());
        assert!(cells.iter().all(|c| c.count() >= 1));
    }

    #[test]
    fn test_single_pass_matches_scan() {
        let boxes = [
            unit_box(),
            tile_to_bounding_box(0, 0, 0).unwrap(),
            tile_to_bounding_box(13, 7275, 3224).unwrap(),
            BoundingBox::new(-0.3, -0.1, 0.7, 0.2).unwrap(),
        ];
        let grids = [
            GridSpec::default(),
            GridSpec::new(1, 1).unwrap(),
            GridSpec::new(3, 7).unwrap(),
        ];

        for (i, bounds) in boxes.iter().enumerate() {
            for grid in grids {
                let shops = scattered_shops(bounds, 400, i as u64 + 11);
                assert_eq!(
                    aggregate(&shops, bounds, grid),
                    aggregate_by_scan(&shops, bounds, grid)
                );
            }
        }
    }

    #[test]
    fn test_huge_grid_only_tracks_occupied_cells() {
        let bounds = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let grid = GridSpec::new(u32::MAX, u32::MAX).unwrap();
        let shops = vec![shop_at(1, 0.5, 0.5), shop_at(2, 0.5, 0.5), shop_at(3, 0.25, 0.75)];

        let cells = aggregate(&shops, &bounds, grid);

        assert_eq!(cells.len(), 2);
        assert_eq!(cells.iter().map(|c| c.count()).sum::<u32>(), 3);
        assert!(cells.iter().any(|c| c.count() == 2));
        assert!(cells.iter().all(|c| c.col() < u32::MAX && c.row() < u32::MAX));
    }
}
