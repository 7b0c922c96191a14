use log::warn;
use ndarray::{Array1, Array2};

use super::poly::{dot, monomials, monomials_deriv_a, monomials_deriv_b, NUM_TERMS};
use crate::error::{Result, RpcError};

/// 20 coefficients for one numerator or denominator.
pub type Coeffs = [f64; NUM_TERMS];

/// A pair (numerator, denominator) of 20-term rational polynomials.
#[derive(Debug, Clone, Copy)]
pub struct RationalPolynomial {
    pub num: Coeffs,
    pub den: Coeffs,
}

impl RationalPolynomial {
    fn eval(&self, m: &[f64; NUM_TERMS]) -> (f64, f64) {
        (dot(&self.num, m), dot(&self.den, m))
    }
}

/// Inverse map: (lon, lat, alt) -> (col, row).
#[derive(Debug, Clone, Copy)]
pub struct InverseCoefficients {
    pub col: RationalPolynomial,
    pub row: RationalPolynomial,
}

/// Direct map: (col, row, alt) -> (lon, lat).
#[derive(Debug, Clone, Copy)]
pub struct DirectCoefficients {
    pub lon: RationalPolynomial,
    pub lat: RationalPolynomial,
}

/// Which rational maps an RPC coefficient bundle actually carries.
///
/// Replaces the common "is Num_COL present?" presence check with a tagged
/// record so every call site names the contract it relies on.
#[derive(Debug, Clone, Copy)]
pub enum RpcDirection {
    InverseOnly(InverseCoefficients),
    DirectOnly(DirectCoefficients),
    Both {
        inverse: InverseCoefficients,
        direct: DirectCoefficients,
    },
}

impl RpcDirection {
    pub fn inverse(&self) -> Option<&InverseCoefficients> {
        match self {
            RpcDirection::InverseOnly(i) => Some(i),
            RpcDirection::Both { inverse, .. } => Some(inverse),
            RpcDirection::DirectOnly(_) => None,
        }
    }

    pub fn direct(&self) -> Option<&DirectCoefficients> {
        match self {
            RpcDirection::DirectOnly(d) => Some(d),
            RpcDirection::Both { direct, .. } => Some(direct),
            RpcDirection::InverseOnly(_) => None,
        }
    }
}

/// Normalization offsets and scales for every axis RPC coefficients touch.
#[derive(Debug, Clone, Copy)]
pub struct Normalization {
    pub col_offset: f64,
    pub col_scale: f64,
    pub row_offset: f64,
    pub row_scale: f64,
    pub alt_offset: f64,
    pub alt_scale: f64,
    pub lon_offset: f64,
    pub lon_scale: f64,
    pub lat_offset: f64,
    pub lat_scale: f64,
}

/// Full RPC coefficient bundle as handed over by a loader.
#[derive(Debug, Clone)]
pub struct RpcCoefficients {
    pub direction: RpcDirection,
    pub norm: Normalization,
    /// Source format the coefficients were parsed from, if known
    /// (e.g. "dimap_v2", "geotiff", "ossim_kwl").
    pub driver_type: Option<String>,
}

/// A ground point in the (lon, lat, alt) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPoint {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

/// Batched inverse-localization result: sensor position per input row.
#[derive(Debug, Clone)]
pub struct InverseLoc {
    pub row: Array1<f64>,
    pub col: Array1<f64>,
    pub alt: Array1<f64>,
}

/// Batched direct-localization result: ground position per input row.
#[derive(Debug, Clone)]
pub struct DirectLoc {
    pub lon: Array1<f64>,
    pub lat: Array1<f64>,
    pub alt: Array1<f64>,
}

fn warn_if_extrapolated(axis: &str, normalized: f64, lim: f64) {
    if normalized.abs() > lim {
        warn!("pixel extrapolated: {axis} normalized value {normalized} exceeds lim_extrapol {lim}");
    }
}

fn broadcast(values: &Array1<f64>, n: usize) -> Result<Array1<f64>> {
    match values.len() {
        len if len == n => Ok(values.clone()),
        1 => Ok(Array1::from_elem(n, values[0])),
        len => Err(RpcError::ShapeMismatch {
            expected: n,
            got: len,
        }
        .into()),
    }
}

/// RPC sensor model: rational-polynomial evaluation plus iterative inversion.
#[derive(Debug, Clone)]
pub struct RpcModel {
    coeffs: RpcCoefficients,
    lim_extrapol: f64,
}

impl RpcModel {
    pub fn new(coeffs: RpcCoefficients) -> Self {
        Self {
            coeffs,
            lim_extrapol: 1.0001,
        }
    }

    pub fn coefficients(&self) -> &RpcCoefficients {
        &self.coeffs
    }

    /// Inverse localization: (lon, lat, alt) -> (row, col, alt).
    ///
    /// `alt` broadcasts if given as a length-1 array. Fails if no inverse
    /// coefficients are present.
    pub fn inverse_loc(
        &self,
        lon: &Array1<f64>,
        lat: &Array1<f64>,
        alt: &Array1<f64>,
    ) -> Result<InverseLoc> {
        let inv = self
            .coeffs
            .direction
            .inverse()
            .ok_or(RpcError::MissingInverseCoefficients)?;
        let n = lon.len();
        let alt = broadcast(alt, n)?;
        let norm = &self.coeffs.norm;

        let mut col = Array1::<f64>::zeros(n);
        let mut row = Array1::<f64>::zeros(n);

        for i in 0..n {
            let a = (lon[i] - norm.lon_offset) / norm.lon_scale;
            let b = (lat[i] - norm.lat_offset) / norm.lat_scale;
            let c = (alt[i] - norm.alt_offset) / norm.alt_scale;
            warn_if_extrapolated("longitude", a, self.lim_extrapol);
            warn_if_extrapolated("latitude", b, self.lim_extrapol);
            warn_if_extrapolated("altitude", c, self.lim_extrapol);

            let m = monomials(a, b, c);
            let (col_num, col_den) = inv.col.eval(&m);
            let (row_num, row_den) = inv.row.eval(&m);

            col[i] = col_num / col_den * norm.col_scale + norm.col_offset;
            row[i] = row_num / row_den * norm.row_scale + norm.row_offset;
        }

        Ok(InverseLoc { row, col, alt })
    }

    /// Scalar convenience wrapper over [`Self::inverse_loc`].
    pub fn inverse_loc_scalar(&self, lon: f64, lat: f64, alt: f64) -> Result<(f64, f64, f64)> {
        let r = self.inverse_loc(
            &Array1::from_elem(1, lon),
            &Array1::from_elem(1, lat),
            &Array1::from_elem(1, alt),
        )?;
        Ok((r.row[0], r.col[0], r.alt[0]))
    }

    /// Analytic Jacobian of the inverse map at (lon, lat, alt).
    ///
    /// Returns (dcol/dlon, dcol/dlat, drow/dlon, drow/dlat).
    pub fn calc_derivatives_inv(
        &self,
        lon: &Array1<f64>,
        lat: &Array1<f64>,
        alt: &Array1<f64>,
    ) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>, Array1<f64>)> {
        let inv = self
            .coeffs
            .direction
            .inverse()
            .ok_or(RpcError::MissingInverseCoefficients)?;
        let n = lon.len();
        let alt = broadcast(alt, n)?;
        let norm = &self.coeffs.norm;

        let mut dcol_dlon = Array1::<f64>::zeros(n);
        let mut dcol_dlat = Array1::<f64>::zeros(n);
        let mut drow_dlon = Array1::<f64>::zeros(n);
        let mut drow_dlat = Array1::<f64>::zeros(n);

        for i in 0..n {
            let a = (lon[i] - norm.lon_offset) / norm.lon_scale;
            let b = (lat[i] - norm.lat_offset) / norm.lat_scale;
            let c = (alt[i] - norm.alt_offset) / norm.alt_scale;

            let m = monomials(a, b, c);
            let m_da = monomials_deriv_a(a, b, c);
            let m_db = monomials_deriv_b(a, b, c);

            let (num_col, den_col) = inv.col.eval(&m);
            let (num_row, den_row) = inv.row.eval(&m);

            let (num_col_da, den_col_da) = inv.col.eval(&m_da);
            let (num_row_da, den_row_da) = inv.row.eval(&m_da);
            let (num_col_db, den_col_db) = inv.col.eval(&m_db);
            let (num_row_db, den_row_db) = inv.row.eval(&m_db);

            // derive (u/v)' = (u'v - v'u)/v^2
            dcol_dlon[i] = norm.col_scale / norm.lon_scale
                * (num_col_da * den_col - den_col_da * num_col)
                / (den_col * den_col);
            dcol_dlat[i] = norm.col_scale / norm.lat_scale
                * (num_col_db * den_col - den_col_db * num_col)
                / (den_col * den_col);
            drow_dlon[i] = norm.row_scale / norm.lon_scale
                * (num_row_da * den_row - den_row_da * num_row)
                / (den_row * den_row);
            drow_dlat[i] = norm.row_scale / norm.lat_scale
                * (num_row_db * den_row - den_row_db * num_row)
                / (den_row * den_row);
        }

        Ok((dcol_dlon, dcol_dlat, drow_dlon, drow_dlat))
    }

    /// Direct localization at constant altitude: (row, col, alt) -> (lon, lat, alt).
    ///
    /// Evaluates the direct map when present; otherwise delegates to the
    /// iterative inverter. NaN at input position i yields `(lon_offset,
    /// lat_offset)` when `fill_nan` else NaN, at that position only.
    pub fn direct_loc_h(
        &self,
        row: &Array1<f64>,
        col: &Array1<f64>,
        alt: f64,
        fill_nan: bool,
    ) -> DirectLoc {
        let n = col.len();
        let alt_out = Array1::from_elem(n, alt);
        let norm = self.coeffs.norm;

        let (fill_lon, fill_lat) = if fill_nan {
            (norm.lon_offset, norm.lat_offset)
        } else {
            (f64::NAN, f64::NAN)
        };

        let mut lon = Array1::from_elem(n, fill_lon);
        let mut lat = Array1::from_elem(n, fill_lat);

        let valid_idx: Vec<usize> = (0..n).filter(|&i| !row[i].is_nan() && !col[i].is_nan()).collect();
        if valid_idx.is_empty() {
            return DirectLoc { lon, lat, alt: alt_out };
        }

        if let Some(direct) = self.coeffs.direction.direct() {
            for &i in &valid_idx {
                let a = (col[i] - norm.col_offset) / norm.col_scale;
                let b = (row[i] - norm.row_offset) / norm.row_scale;
                let c = (alt - norm.alt_offset) / norm.alt_scale;
                warn_if_extrapolated("column", a, self.lim_extrapol);
                warn_if_extrapolated("row", b, self.lim_extrapol);
                warn_if_extrapolated("altitude", c, self.lim_extrapol);

                let m = monomials(a, b, c);
                let (lon_num, lon_den) = direct.lon.eval(&m);
                let (lat_num, lat_den) = direct.lat.eval(&m);

                lon[i] = lon_num / lon_den * norm.lon_scale + norm.lon_offset;
                lat[i] = lat_num / lat_den * norm.lat_scale + norm.lat_offset;
            }
        } else {
            let row_sub = Array1::from_iter(valid_idx.iter().map(|&i| row[i]));
            let col_sub = Array1::from_iter(valid_idx.iter().map(|&i| col[i]));
            if let Ok(iterative) = self.direct_loc_inverse_iterative(&row_sub, &col_sub, alt, 10, fill_nan) {
                for (k, &i) in valid_idx.iter().enumerate() {
                    lon[i] = iterative.lon[k];
                    lat[i] = iterative.lat[k];
                }
            }
        }

        DirectLoc { lon, lat, alt: alt_out }
    }

    /// Scalar convenience wrapper over [`Self::direct_loc_h`].
    pub fn direct_loc_h_scalar(&self, row: f64, col: f64, alt: f64, fill_nan: bool) -> (f64, f64, f64) {
        let r = self.direct_loc_h(&Array1::from_elem(1, row), &Array1::from_elem(1, col), alt, fill_nan);
        (r.lon[0], r.lat[0], r.alt[0])
    }

    /// Newton refinement of direct localization using only inverse coefficients.
    ///
    /// Non-convergence after `nb_iter_max` iterations is accepted silently;
    /// the caller gets the last estimate, by design.
    pub fn direct_loc_inverse_iterative(
        &self,
        row: &Array1<f64>,
        col: &Array1<f64>,
        alt: f64,
        nb_iter_max: usize,
        fill_nan: bool,
    ) -> Result<DirectLoc> {
        self.coeffs
            .direction
            .inverse()
            .ok_or(RpcError::MissingInverseCoefficients)?;
        let norm = self.coeffs.norm;
        let n = col.len();
        let alt_out = Array1::from_elem(n, alt);

        let (fill_lon, fill_lat) = if fill_nan {
            (norm.lon_offset, norm.lat_offset)
        } else {
            (f64::NAN, f64::NAN)
        };
        let mut lon = Array1::from_elem(n, fill_lon);
        let mut lat = Array1::from_elem(n, fill_lat);

        let valid_idx: Vec<usize> = (0..n).filter(|&i| !row[i].is_nan() && !col[i].is_nan()).collect();
        if valid_idx.is_empty() {
            return Ok(DirectLoc { lon, lat, alt: alt_out });
        }

        let row_t: Vec<f64> = valid_idx.iter().map(|&i| row[i]).collect();
        let col_t: Vec<f64> = valid_idx.iter().map(|&i| col[i]).collect();
        let m = row_t.len();

        let (row_start, col_start, _) = self.inverse_loc_scalar(norm.lon_offset, norm.lat_offset, alt)?;
        let mut cur_lon = vec![norm.lon_offset; m];
        let mut cur_lat = vec![norm.lat_offset; m];
        let mut delta_col: Vec<f64> = col_t.iter().map(|c| c - col_start).collect();
        let mut delta_row: Vec<f64> = row_t.iter().map(|r| r - row_start).collect();

        let eps = 1e-6;
        let mut iteration = 0;
        while iteration < nb_iter_max
            && (delta_col.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) > eps
                || delta_row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())) > eps)
        {
            let active: Vec<usize> = (0..m)
                .filter(|&k| delta_col[k].abs() > eps || delta_row[k].abs() > eps)
                .collect();

            let lon_active = Array1::from_iter(active.iter().map(|&k| cur_lon[k]));
            let lat_active = Array1::from_iter(active.iter().map(|&k| cur_lat[k]));
            let alt_active = Array1::from_elem(active.len(), alt);

            let (dcol_dlon, dcol_dlat, drow_dlon, drow_dlat) =
                self.calc_derivatives_inv(&lon_active, &lat_active, &alt_active)?;

            for (k_idx, &k) in active.iter().enumerate() {
                let det = dcol_dlon[k_idx] * drow_dlat[k_idx] - drow_dlon[k_idx] * dcol_dlat[k_idx];
                let d_lon = (drow_dlat[k_idx] * delta_col[k] - dcol_dlat[k_idx] * delta_row[k]) / det;
                let d_lat = (-drow_dlon[k_idx] * delta_col[k] + dcol_dlon[k_idx] * delta_row[k]) / det;
                cur_lon[k] += d_lon;
                cur_lat[k] += d_lat;
            }

            let lon_active2 = Array1::from_iter(active.iter().map(|&k| cur_lon[k]));
            let lat_active2 = Array1::from_iter(active.iter().map(|&k| cur_lat[k]));
            let alt_active2 = Array1::from_elem(active.len(), alt);
            let estim = self.inverse_loc(&lon_active2, &lat_active2, &alt_active2)?;

            for (k_idx, &k) in active.iter().enumerate() {
                delta_col[k] = col_t[k] - estim.col[k_idx];
                delta_row[k] = row_t[k] - estim.row[k_idx];
            }

            iteration += 1;
        }

        for (k, &i) in valid_idx.iter().enumerate() {
            lon[i] = cur_lon[k];
            lat[i] = cur_lat[k];
        }

        Ok(DirectLoc { lon, lat, alt: alt_out })
    }

    /// The altitude envelope implied by the RPC normalization: (offset -
    /// scale/2, offset + scale/2).
    pub fn get_alt_min_max(&self) -> (f64, f64) {
        let norm = &self.coeffs.norm;
        (
            norm.alt_offset - norm.alt_scale / 2.0,
            norm.alt_offset + norm.alt_scale / 2.0,
        )
    }

    /// Two ground points bounding the line of sight for (row, col), at
    /// `alt_max` and `alt_min` in that order. Falls back to
    /// [`Self::get_alt_min_max`] when altitudes are not given.
    pub fn los_extrema(
        &self,
        row: f64,
        col: f64,
        alt_min: Option<f64>,
        alt_max: Option<f64>,
    ) -> [GroundPoint; 2] {
        let (alt_min, alt_max) = match (alt_min, alt_max) {
            (Some(mn), Some(mx)) => (mn, mx),
            _ => self.get_alt_min_max(),
        };
        let row_arr = Array1::from_elem(1, row);
        let col_arr = Array1::from_elem(1, col);
        let top = self.direct_loc_h(&row_arr, &col_arr, alt_max, false);
        let bottom = self.direct_loc_h(&row_arr, &col_arr, alt_min, false);
        [
            GroundPoint {
                lon: top.lon[0],
                lat: top.lat[0],
                alt: alt_max,
            },
            GroundPoint {
                lon: bottom.lon[0],
                lat: bottom.lat[0],
                alt: alt_min,
            },
        ]
    }

    /// Direct localization sampled on a regular sensor grid at constant
    /// altitude. Returns (lon grid, lat grid) of shape (nbrow, nbcol).
    pub fn direct_loc_grid_h(
        &self,
        row0: f64,
        col0: f64,
        steprow: f64,
        stepcol: f64,
        nbrow: usize,
        nbcol: usize,
        alt: f64,
    ) -> (Array2<f64>, Array2<f64>) {
        let mut lon_grid = Array2::<f64>::zeros((nbrow, nbcol));
        let mut lat_grid = Array2::<f64>::zeros((nbrow, nbcol));

        let row_arr = Array1::from_shape_fn(nbrow, |line| row0 + steprow * line as f64);
        for column in 0..nbcol {
            let col = col0 + stepcol * column as f64;
            let col_arr = Array1::from_elem(nbrow, col);
            let loc = self.direct_loc_h(&row_arr, &col_arr, alt, false);
            for line in 0..nbrow {
                lon_grid[[line, column]] = loc.lon[line];
                lat_grid[[line, column]] = loc.lat[line];
            }
        }

        (lon_grid, lat_grid)
    }
}
