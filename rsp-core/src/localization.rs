//! Facade tying a sensor model to an optional terrain model.

use crate::dtm::Dtm;
use crate::error::{Result, RspError};
use crate::sensor::rpc::{DirectLoc, GroundPoint, InverseLoc, RpcModel};
use ndarray::Array1;

/// Geolocation entry point: a sensor model, optionally paired with a DTM
/// for ray/terrain intersection. Borrows both rather than owning them, so
/// the same RPC model or DTM can back several localizations at once.
pub struct Localization<'a> {
    rpc: &'a RpcModel,
    dtm: Option<&'a Dtm>,
}

impl<'a> Localization<'a> {
    pub fn new(rpc: &'a RpcModel) -> Self {
        Self { rpc, dtm: None }
    }

    pub fn with_dtm(rpc: &'a RpcModel, dtm: &'a Dtm) -> Self {
        Self { rpc, dtm: Some(dtm) }
    }

    /// Direct localization at a given altitude, delegating to the sensor model.
    pub fn direct(&self, row: &Array1<f64>, col: &Array1<f64>, alt: f64, fill_nan: bool) -> DirectLoc {
        self.rpc.direct_loc_h(row, col, alt, fill_nan)
    }

    /// Inverse localization, delegating to the sensor model.
    pub fn inverse(&self, lon: &Array1<f64>, lat: &Array1<f64>, alt: &Array1<f64>) -> Result<InverseLoc> {
        self.rpc.inverse_loc(lon, lat, alt)
    }

    /// Direct localization onto terrain: build the line of sight for
    /// (row, col), clip it to the DTM's bounding cube, and intersect it
    /// with the terrain surface.
    ///
    /// Requires a DTM; returns `RspError::InvalidInput` if this facade was
    /// built without one, a DTM error if the ray misses the cube or the
    /// surface.
    pub fn direct_dtm(&self, row: f64, col: f64) -> Result<GroundPoint> {
        let dtm = self
            .dtm
            .ok_or_else(|| RspError::InvalidInput("direct_dtm requires a DTM".to_string()))?;

        // Pad 1m beyond the grid's altitude extent so a terrain hit at
        // exactly z_min or z_max doesn't land on a cube face.
        let los = self
            .rpc
            .los_extrema(row, col, Some(dtm.z_min() - 1.0), Some(dtm.z_max() + 1.0));
        let clipped = dtm.intersect_cube(&los)?;
        dtm.intersection(&los, &clipped)
    }

    pub fn has_dtm(&self) -> bool {
        self.dtm.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::rpc::{
        DirectCoefficients, InverseCoefficients, Normalization, RationalPolynomial, RpcCoefficients,
        RpcDirection,
    };
    use crate::sensor::poly::NUM_TERMS;
    use ndarray::arr2;

    fn simple_poly(constant: f64, linear_term: usize, linear_coeff: f64) -> RationalPolynomial {
        let mut num = [0.0; NUM_TERMS];
        num[0] = constant;
        num[linear_term] = linear_coeff;
        let mut den = [0.0; NUM_TERMS];
        den[0] = 1.0;
        RationalPolynomial { num, den }
    }

    fn flat_rpc() -> RpcModel {
        let norm = Normalization {
            col_offset: 500.0,
            col_scale: 500.0,
            row_offset: 500.0,
            row_scale: 500.0,
            alt_offset: 100.0,
            alt_scale: 50.0,
            lon_offset: 2.0,
            lon_scale: 0.01,
            lat_offset: 48.0,
            lat_scale: 0.01,
        };
        let inverse = InverseCoefficients {
            col: simple_poly(0.0, 1, 1.0),
            row: simple_poly(0.0, 2, 1.0),
        };
        let direct = DirectCoefficients {
            lon: simple_poly(0.0, 1, 1.0),
            lat: simple_poly(0.0, 2, 1.0),
        };
        RpcModel::new(RpcCoefficients {
            direction: RpcDirection::Both { inverse, direct },
            norm,
            driver_type: Some("synthetic".to_string()),
        })
    }

    #[test]
    fn direct_and_inverse_delegate_to_the_sensor_model() {
        let rpc = flat_rpc();
        let loc = Localization::new(&rpc);
        assert!(!loc.has_dtm());

        let row = Array1::from_elem(1, 500.0);
        let col = Array1::from_elem(1, 500.0);
        let direct = loc.direct(&row, &col, 100.0, false);
        assert!((direct.lon[0] - 2.0).abs() < 1e-9);
        assert!((direct.lat[0] - 48.0).abs() < 1e-9);
    }

    #[test]
    fn direct_dtm_hits_flat_terrain_under_sensor_footprint() {
        let rpc = flat_rpc();
        let grid = arr2(&[[10.0, 10.0], [10.0, 10.0]]);
        // cover the RPC's direct-map footprint at (2.0, 48.0): centered grid
        // in ground degrees, generously large so the LOS stays inside.
        let dtm = Dtm::new(grid, 1.0, 47.0, 2.0, 2.0);
        let loc = Localization::with_dtm(&rpc, &dtm);
        assert!(loc.has_dtm());

        let hit = loc.direct_dtm(500.0, 500.0).unwrap();
        assert!((hit.alt - 10.0).abs() < 1e-6);
        assert!((hit.lon - 2.0).abs() < 1e-6);
        assert!((hit.lat - 48.0).abs() < 1e-6);
    }

    #[test]
    fn direct_dtm_without_a_dtm_is_an_invalid_input_error() {
        let rpc = flat_rpc();
        let loc = Localization::new(&rpc);

        let result = loc.direct_dtm(500.0, 500.0);
        assert!(matches!(result, Err(RspError::InvalidInput(_))));
    }
}
