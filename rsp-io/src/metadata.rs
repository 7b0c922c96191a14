use gdal::Dataset;
use nalgebra::{UnitQuaternion, Vector3};
use rsp_core::error::{Result, RspError};
use rsp_core::sensor::{
    Coeffs, InverseCoefficients, Normalization, RationalPolynomial, RpcCoefficients, RpcDirection,
};
use std::collections::HashMap;

/// RPC source formats a full loader would dispatch on. Only `Geotiff` is
/// implemented; the others document the formats this crate does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcDriver {
    Geotiff,
    DimapV2,
    OssimKwl,
    Euclidium,
}

/// Container for all image metadata
#[derive(Debug, Clone, Default)]
pub struct ImageMetadata {
    pub rpc: Option<RpcCoefficients>,
    pub gps_position: Option<Vector3<f64>>,
    pub imu_orientation: Option<UnitQuaternion<f64>>,
    pub timestamp: Option<f64>,
    pub camera_id: Option<String>,
}

impl ImageMetadata {
    /// Extract all available metadata from GDAL dataset
    pub fn from_gdal_dataset(dataset: &Dataset) -> Self {
        Self {
            rpc: extract_rpc(dataset).ok(),
            ..Default::default()
        }
    }

    /// Check if image has RPC
    pub fn has_rpc(&self) -> bool {
        self.rpc.is_some()
    }
}

/// Extract RPC coefficients from a GDAL dataset's `RPC` metadata domain.
///
/// GDAL's RPC domain only ever carries the object-to-image (ground to
/// pixel) map, so the result is always [`RpcDirection::InverseOnly`].
fn extract_rpc(dataset: &Dataset) -> Result<RpcCoefficients> {
    let metadata = dataset
        .metadata_domain("RPC")
        .ok_or_else(|| RspError::Io("RPC metadata not found".to_string()))?;

    let norm = Normalization {
        col_offset: parse_single(&metadata, "SAMP_OFF")?,
        col_scale: parse_single(&metadata, "SAMP_SCALE")?,
        row_offset: parse_single(&metadata, "LINE_OFF")?,
        row_scale: parse_single(&metadata, "LINE_SCALE")?,
        alt_offset: parse_single(&metadata, "HEIGHT_OFF")?,
        alt_scale: parse_single(&metadata, "HEIGHT_SCALE")?,
        lon_offset: parse_single(&metadata, "LONG_OFF")?,
        lon_scale: parse_single(&metadata, "LONG_SCALE")?,
        lat_offset: parse_single(&metadata, "LAT_OFF")?,
        lat_scale: parse_single(&metadata, "LAT_SCALE")?,
    };

    let inverse = InverseCoefficients {
        col: RationalPolynomial {
            num: parse_coeff_array(&metadata, "SAMP_NUM_COEFF")?,
            den: parse_coeff_array(&metadata, "SAMP_DEN_COEFF")?,
        },
        row: RationalPolynomial {
            num: parse_coeff_array(&metadata, "LINE_NUM_COEFF")?,
            den: parse_coeff_array(&metadata, "LINE_DEN_COEFF")?,
        },
    };

    Ok(RpcCoefficients {
        direction: RpcDirection::InverseOnly(inverse),
        norm,
        driver_type: Some("gdal_rpc".to_string()),
    })
}

/// GDAL stores each `*_COEFF` entry as one string of 20 space-separated
/// values, not as 20 separate keys.
fn parse_coeff_array(metadata: &HashMap<String, String>, key: &str) -> Result<Coeffs> {
    let raw = metadata
        .get(key)
        .ok_or_else(|| RspError::Io(format!("Missing RPC parameter: {key}")))?;

    let mut coeffs = [0.0; 20];
    let mut count = 0;
    for (i, token) in raw.split_whitespace().enumerate() {
        if i >= 20 {
            break;
        }
        coeffs[i] = token
            .parse()
            .map_err(|_| RspError::Io(format!("Failed to parse RPC coefficient in {key}: {token}")))?;
        count += 1;
    }
    if count != 20 {
        return Err(RspError::Io(format!(
            "Expected 20 coefficients for {key}, got {count}"
        )));
    }

    Ok(coeffs)
}

fn parse_single(metadata: &HashMap<String, String>, key: &str) -> Result<f64> {
    let value = metadata
        .get(key)
        .ok_or_else(|| RspError::Io(format!("Missing RPC parameter: {key}")))?;

    value
        .trim()
        .parse()
        .map_err(|_| RspError::Io(format!("Failed to parse RPC parameter: {key}")))
}
