//! Digital Terrain Model: a georeferenced elevation grid, ray/cube clipping,
//! and ray/bilinear-surface intersection.

use ndarray::Array2;

use crate::error::{DtmError, Result};
use crate::sensor::rpc::GroundPoint;

/// A line of sight: two ground points, `[far, near]` or any two distinct
/// points along the ray. Matches the pair returned by `RpcModel::los_extrema`.
pub type Los = [GroundPoint; 2];

/// One face of the bounding cube, `a*row + b*col + c*z = d`.
#[derive(Debug, Clone, Copy)]
struct Plane {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

/// The clipped intersection of a line of sight with a DTM's bounding cube.
#[derive(Debug, Clone, Copy)]
pub struct ClippedLos {
    pub entry: GroundPoint,
    pub exit: GroundPoint,
    t_entry: f64,
    t_exit: f64,
}

/// A georeferenced elevation grid with cached per-cell envelopes and
/// bounding-cube planes, built once at construction.
#[derive(Debug, Clone)]
pub struct Dtm {
    grid: Array2<f64>,
    x0: f64,
    y0: f64,
    px: f64,
    py: f64,
    z_min: f64,
    z_max: f64,
    z_min_cell: Array2<f64>,
    z_max_cell: Array2<f64>,
    #[allow(dead_code)]
    planes: [Plane; 6],
    tol_z: f64,
}

impl Dtm {
    /// Build a DTM from a (nl, nc) elevation grid and its georeferencing.
    /// Per-cell envelopes and bounding planes are computed once, here.
    pub fn new(grid: Array2<f64>, x0: f64, y0: f64, px: f64, py: f64) -> Self {
        let (nl, nc) = grid.dim();
        let z_min = grid.iter().cloned().fold(f64::INFINITY, f64::min);
        let z_max = grid.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let mut z_min_cell = Array2::<f64>::zeros((nl - 1, nc - 1));
        let mut z_max_cell = Array2::<f64>::zeros((nl - 1, nc - 1));
        for i in 0..nl - 1 {
            for j in 0..nc - 1 {
                let corners = [
                    grid[[i, j]],
                    grid[[i, j + 1]],
                    grid[[i + 1, j]],
                    grid[[i + 1, j + 1]],
                ];
                let lo = corners.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = corners.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                // floor/ceil, not round: adjacent cells must overlap in altitude
                // or the traversal loses the straddling case on flat cells.
                z_min_cell[[i, j]] = lo.floor();
                z_max_cell[[i, j]] = hi.ceil();
            }
        }

        let planes = [
            Plane { a: 1.0, b: 0.0, c: 0.0, d: 0.0 },
            Plane { a: 1.0, b: 0.0, c: 0.0, d: (nl - 1) as f64 },
            Plane { a: 0.0, b: 1.0, c: 0.0, d: 0.0 },
            Plane { a: 0.0, b: 1.0, c: 0.0, d: (nc - 1) as f64 },
            Plane { a: 0.0, b: 0.0, c: 1.0, d: z_min },
            Plane { a: 0.0, b: 0.0, c: 1.0, d: z_max },
        ];

        Self {
            grid,
            x0,
            y0,
            px,
            py,
            z_min,
            z_max,
            z_min_cell,
            z_max_cell,
            planes,
            tol_z: 1e-4,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.dim()
    }

    pub fn z_min(&self) -> f64 {
        self.z_min
    }

    pub fn z_max(&self) -> f64 {
        self.z_max
    }

    /// Ground frame (x = lon-like, y = lat-like) to grid frame (row, col).
    /// Note the swap: ground y maps to grid row, ground x to grid column.
    pub fn ground_to_grid(&self, p: GroundPoint) -> (f64, f64) {
        let row = (p.lat - self.y0) / self.py;
        let col = (p.lon - self.x0) / self.px;
        (row, col)
    }

    /// Grid frame (row, col, z) to ground frame.
    pub fn grid_to_ground(&self, row: f64, col: f64, z: f64) -> GroundPoint {
        GroundPoint {
            lon: self.x0 + self.px * col,
            lat: self.y0 + self.py * row,
            alt: z,
        }
    }

    /// Bilinear interpolation at grid-frame point (row, col). Out-of-grid
    /// queries clamp to the last full cell rather than faulting.
    pub fn interpolate(&self, row: f64, col: f64) -> f64 {
        let (nl, nc) = self.grid.dim();

        let i1 = if row < 0.0 {
            0
        } else if row >= (nl - 1) as f64 {
            nl - 2
        } else {
            row.floor() as usize
        };
        let i2 = i1 + 1;

        let j1 = if col < 0.0 {
            0
        } else if col >= (nc - 1) as f64 {
            nc - 2
        } else {
            col.floor() as usize
        };
        let j2 = j1 + 1;

        let u = col - j1 as f64;
        let v = row - i1 as f64;

        (1.0 - u) * (1.0 - v) * self.grid[[i1, j1]]
            + u * (1.0 - v) * self.grid[[i1, j2]]
            + (1.0 - u) * v * self.grid[[i2, j1]]
            + u * v * self.grid[[i2, j2]]
    }

    /// Clip a line of sight to the DTM's bounding cube. For each of the
    /// three axis pairs, compute the ray parameter at entry/exit; keep the
    /// maximum of the entry parameters and the minimum of the exit
    /// parameters. If entry ends up past exit, the ray misses the cube.
    pub fn intersect_cube(&self, los: &Los) -> Result<ClippedLos> {
        let (row0, col0) = self.ground_to_grid(los[0]);
        let (row1, col1) = self.ground_to_grid(los[1]);
        let z0 = los[0].alt;
        let z1 = los[1].alt;

        let d_row = row1 - row0;
        let d_col = col1 - col0;
        let d_z = z1 - z0;

        let (nl, nc) = self.grid.dim();

        let mut t_min = 0.0_f64;
        let mut t_max = 1.0_f64;

        for &(p0, d, lo, hi) in &[
            (row0, d_row, 0.0, (nl - 1) as f64),
            (col0, d_col, 0.0, (nc - 1) as f64),
            (z0, d_z, self.z_min, self.z_max),
        ] {
            if d.abs() < f64::EPSILON {
                if p0 < lo || p0 > hi {
                    return Err(DtmError::CubeMiss.into());
                }
                continue;
            }
            let t_a = (lo - p0) / d;
            let t_b = (hi - p0) / d;
            let (t_near, t_far) = if t_a < t_b { (t_a, t_b) } else { (t_b, t_a) };
            t_min = t_min.max(t_near);
            t_max = t_max.min(t_far);
        }

        if t_min > t_max {
            return Err(DtmError::CubeMiss.into());
        }

        let entry = GroundPoint {
            lon: los[0].lon + t_min * (los[1].lon - los[0].lon),
            lat: los[0].lat + t_min * (los[1].lat - los[0].lat),
            alt: z0 + t_min * d_z,
        };
        let exit = GroundPoint {
            lon: los[0].lon + t_max * (los[1].lon - los[0].lon),
            lat: los[0].lat + t_max * (los[1].lat - los[0].lat),
            alt: z0 + t_max * d_z,
        };

        Ok(ClippedLos {
            entry,
            exit,
            t_entry: t_min,
            t_exit: t_max,
        })
    }

    /// Walk cell by cell along the clipped segment, rejecting quickly by
    /// altitude envelope, and solve the quadratic-in-t ray/bilinear-surface
    /// equation within each candidate cell. Returns the first hit.
    ///
    /// The walk is a DDA: every `t` where the ray crosses an integer row or
    /// column grid line between entry and exit is a breakpoint, so a ray
    /// that crosses a row and a column boundary in the same stretch still
    /// visits every cell it passes through, not just one of them.
    pub fn intersection(&self, los: &Los, clipped: &ClippedLos) -> Result<GroundPoint> {
        let (row0, col0) = self.ground_to_grid(los[0]);
        let (row1, col1) = self.ground_to_grid(los[1]);
        let z0 = los[0].alt;
        let z1 = los[1].alt;

        let d_row = row1 - row0;
        let d_col = col1 - col0;
        let d_z = z1 - z0;

        let (nl, nc) = self.grid.dim();
        let t_entry = clipped.t_entry;
        let t_exit = clipped.t_exit;
        if (t_exit - t_entry).abs() < f64::EPSILON {
            return Err(DtmError::NoIntersection.into());
        }

        let mut breakpoints = vec![t_entry, t_exit];
        push_boundary_crossings(&mut breakpoints, row0, d_row, t_entry, t_exit);
        push_boundary_crossings(&mut breakpoints, col0, d_col, t_entry, t_exit);
        breakpoints.sort_by(|a, b| a.partial_cmp(b).unwrap());
        breakpoints.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        for pair in breakpoints.windows(2) {
            let (t_a, t_b) = (pair[0], pair[1]);
            if t_b - t_a < 1e-12 {
                continue;
            }

            let t_mid = 0.5 * (t_a + t_b);
            let row_mid = row0 + t_mid * d_row;
            let col_mid = col0 + t_mid * d_col;
            let i = (row_mid.floor().max(0.0) as usize).min(nl.saturating_sub(2));
            let j = (col_mid.floor().max(0.0) as usize).min(nc.saturating_sub(2));

            let row_a = row0 + t_a * d_row;
            let col_a = col0 + t_a * d_col;
            let z_a = z0 + t_a * d_z;
            let row_b = row0 + t_b * d_row;
            let col_b = col0 + t_b * d_col;
            let z_b = z0 + t_b * d_z;

            let cell_lo = self.z_min_cell[[i, j]];
            let cell_hi = self.z_max_cell[[i, j]];
            let seg_lo = z_a.min(z_b);
            let seg_hi = z_a.max(z_b);

            if seg_hi >= cell_lo - self.tol_z && seg_lo <= cell_hi + self.tol_z {
                if let Some((row_hit, col_hit, z_hit)) =
                    self.solve_cell(i, j, row_a, col_a, z_a, row_b, col_b, z_b)
                {
                    return Ok(self.grid_to_ground(row_hit, col_hit, z_hit));
                }
            }
        }

        Err(DtmError::NoIntersection.into())
    }

    /// Solve for the first root in [0, 1] of the bilinear surface in cell
    /// (i, j) restricted to the sub-segment (row_a,col_a,z_a)->(row_b,col_b,z_b).
    fn solve_cell(
        &self,
        i: usize,
        j: usize,
        row_a: f64,
        col_a: f64,
        z_a: f64,
        row_b: f64,
        col_b: f64,
        z_b: f64,
    ) -> Option<(f64, f64, f64)> {
        let z11 = self.grid[[i, j]];
        let z12 = self.grid[[i, j + 1]];
        let z21 = self.grid[[i + 1, j]];
        let z22 = self.grid[[i + 1, j + 1]];

        let u_a = col_a - j as f64;
        let v_a = row_a - i as f64;
        let u_b = col_b - j as f64;
        let v_b = row_b - i as f64;

        let bilinear = |u: f64, v: f64| -> f64 {
            (1.0 - u) * (1.0 - v) * z11 + u * (1.0 - v) * z12 + (1.0 - u) * v * z21 + u * v * z22
        };

        // f(s) = surface(s) - ray(s) is quadratic in s; the uv cross term is
        // the only source of curvature, so f is fully determined by f(0),
        // f(1), and that one analytic coefficient.
        let uv_coeff = z11 - z12 - z21 + z22;
        let du = u_b - u_a;
        let dv = v_b - v_a;
        let a_quad = uv_coeff * du * dv;

        let c0 = bilinear(u_a, v_a) - z_a;
        let c1 = bilinear(u_b, v_b) - z_b;
        let b_quad = c1 - c0 - a_quad;

        for s in solve_quadratic(a_quad, b_quad, c0) {
            if (0.0..=1.0).contains(&s) {
                let u = u_a + s * du;
                let v = v_a + s * dv;
                if (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v) {
                    let row = row_a + s * (row_b - row_a);
                    let col = col_a + s * (col_b - col_a);
                    let z = z_a + s * (z_b - z_a);
                    return Some((row, col, z));
                }
            }
        }
        None
    }
}

/// Push every `t` in `(t_entry, t_exit)` at which `p(t) = p0 + t*d` crosses
/// an integer grid line, i.e. every row or column boundary the ray walks
/// through along that axis. Degenerate (axis-parallel) rays contribute none.
fn push_boundary_crossings(out: &mut Vec<f64>, p0: f64, d: f64, t_entry: f64, t_exit: f64) {
    if d.abs() < f64::EPSILON {
        return;
    }
    let p_entry = p0 + t_entry * d;
    let p_exit = p0 + t_exit * d;
    let (lo, hi) = if p_entry < p_exit {
        (p_entry, p_exit)
    } else {
        (p_exit, p_entry)
    };
    let k_start = lo.floor() as i64 + 1;
    let k_end = hi.ceil() as i64 - 1;
    for k in k_start..=k_end {
        let t = (k as f64 - p0) / d;
        if t > t_entry && t < t_exit {
            out.push(t);
        }
    }
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = disc.sqrt();
    let s1 = (-b - sqrt_disc) / (2.0 * a);
    let s2 = (-b + sqrt_disc) / (2.0 * a);
    if s1 <= s2 {
        vec![s1, s2]
    } else {
        vec![s2, s1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn flat_dtm(z: f64) -> Dtm {
        let grid = arr2(&[[z, z, z], [z, z, z], [z, z, z]]);
        Dtm::new(grid, 0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn per_cell_envelope_floor_ceil_on_flat_grid() {
        let dtm = flat_dtm(100.0);
        assert_eq!(dtm.z_min_cell[[0, 0]], 100.0);
        assert_eq!(dtm.z_max_cell[[0, 0]], 100.0);
    }

    #[test]
    fn per_cell_envelope_overlaps_between_cells() {
        // a ramp: flat per row, increasing across rows
        let grid = arr2(&[[0.3, 0.3, 0.3], [1.7, 1.7, 1.7], [3.2, 3.2, 3.2]]);
        let dtm = Dtm::new(grid, 0.0, 0.0, 1.0, 1.0);
        // cell (0,*) spans [0.3, 1.7] -> floor/ceil = [0, 2]
        assert_eq!(dtm.z_min_cell[[0, 0]], 0.0);
        assert_eq!(dtm.z_max_cell[[0, 0]], 2.0);
        // cell (1,*) spans [1.7, 3.2] -> floor/ceil = [1, 4]
        assert_eq!(dtm.z_min_cell[[1, 0]], 1.0);
        assert_eq!(dtm.z_max_cell[[1, 0]], 4.0);
        // the two envelopes overlap on [1, 2], not just touch at a point
        assert!(dtm.z_max_cell[[0, 0]] >= dtm.z_min_cell[[1, 0]]);
    }

    #[test]
    fn interpolate_matches_corner_values() {
        let grid = arr2(&[[0.0, 10.0, 20.0], [5.0, 15.0, 25.0], [10.0, 20.0, 30.0]]);
        let dtm = Dtm::new(grid, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(dtm.interpolate(0.0, 0.0), 0.0);
        assert_eq!(dtm.interpolate(2.0, 2.0), 30.0);
        assert_eq!(dtm.interpolate(0.5, 0.5), (0.0 + 10.0 + 5.0 + 15.0) / 4.0);
    }

    #[test]
    fn interpolate_clamps_out_of_grid_queries() {
        let grid = arr2(&[[0.0, 10.0], [5.0, 15.0]]);
        let dtm = Dtm::new(grid, 0.0, 0.0, 1.0, 1.0);
        // beyond the last full cell: must clamp, not index out of bounds
        let far = dtm.interpolate(10.0, 10.0);
        let edge = dtm.interpolate(1.0, 1.0);
        assert_eq!(far, edge);
    }

    #[test]
    fn ground_grid_roundtrip_respects_axis_swap() {
        let dtm = flat_dtm(100.0);
        let ground = GroundPoint { lon: 2.0, lat: 1.0, alt: 100.0 };
        let (row, col) = dtm.ground_to_grid(ground);
        assert_eq!(row, 1.0); // lat -> row
        assert_eq!(col, 2.0); // lon -> col
        let back = dtm.grid_to_ground(row, col, 100.0);
        assert_eq!(back, ground);
    }

    #[test]
    fn vertical_ray_through_flat_terrain_hits_known_altitude() {
        let dtm = flat_dtm(50.0);
        let los = [
            GroundPoint { lon: 1.0, lat: 1.0, alt: 200.0 },
            GroundPoint { lon: 1.0, lat: 1.0, alt: -50.0 },
        ];
        let clipped = dtm.intersect_cube(&los).unwrap();
        let hit = dtm.intersection(&los, &clipped).unwrap();
        assert!((hit.alt - 50.0).abs() < 1e-6);
        assert!((hit.lon - 1.0).abs() < 1e-9);
        assert!((hit.lat - 1.0).abs() < 1e-9);
    }

    #[test]
    fn diagonal_ray_through_sloped_terrain_is_not_skipped_by_cell_walk() {
        // A plane z = 2*row + 2*col, sampled on a 4x4 grid.
        let grid = arr2(&[
            [0.0, 2.0, 4.0, 6.0],
            [2.0, 4.0, 6.0, 8.0],
            [4.0, 6.0, 8.0, 10.0],
            [6.0, 8.0, 10.0, 12.0],
        ]);
        let dtm = Dtm::new(grid, 0.0, 0.0, 1.0, 1.0);

        // row(t) == col(t) for every t: this ray crosses a row boundary and
        // a column boundary at the exact same parameter, the case a
        // uniform parametric substep walk can assign to the wrong cell (or
        // skip entirely) instead of a true cell-by-cell traversal.
        let los = [
            GroundPoint { lon: 0.5, lat: 0.5, alt: 20.0 },
            GroundPoint { lon: 2.5, lat: 2.5, alt: 0.0 },
        ];
        let clipped = dtm.intersect_cube(&los).unwrap();
        let hit = dtm.intersection(&los, &clipped).unwrap();

        // Analytic solution: z(t) = 20 - 20t meets the plane 4*(0.5 + 2t)
        // at t = 9/14, giving row = col = 0.5 + 18/14 and z = 2 + 8*(9/14).
        assert!((hit.lon - 1.785714285714).abs() < 1e-6);
        assert!((hit.lat - 1.785714285714).abs() < 1e-6);
        assert!((hit.alt - 7.142857142857).abs() < 1e-6);
    }

    #[test]
    fn ray_missing_cube_reports_cube_miss() {
        let dtm = flat_dtm(50.0);
        let los = [
            GroundPoint { lon: 100.0, lat: 100.0, alt: 200.0 },
            GroundPoint { lon: 100.0, lat: 100.0, alt: -50.0 },
        ];
        let result = dtm.intersect_cube(&los);
        assert!(matches!(result, Err(crate::error::RspError::Dtm(DtmError::CubeMiss))));
    }
}
