use gdal::Dataset;
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

use rsp_core::Dtm;

#[derive(Error, Debug)]
pub enum DtmLoadError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("DTM raster has no geotransform")]
    MissingGeotransform,
    #[error("DTM raster must have exactly one band, found {0}")]
    UnexpectedBandCount(usize),
}

pub type Result<T> = std::result::Result<T, DtmLoadError>;

/// Vertical reference a DTM's elevation values are expressed against.
/// GDAL carries no such tag itself; callers set it from external knowledge
/// of the product, defaulting to "geoid" when nothing else is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Geoid,
    Ellipsoid,
}

/// A loaded elevation raster paired with its vertical datum.
pub struct DtmRaster {
    pub dtm: Dtm,
    pub datum: Datum,
}

/// Load a single-band elevation raster into a [`Dtm`].
///
/// The raster's geotransform gives the grid's georeferencing directly:
/// `x0, px` from the transform's origin/column terms, `y0, py` from its
/// origin/row terms. Rotated geotransforms are not supported.
pub fn load_dtm<P: AsRef<Path>>(path: P, datum: Datum) -> Result<DtmRaster> {
    let dataset = Dataset::open(path)?;
    let band_count = dataset.raster_count() as usize;
    if band_count != 1 {
        return Err(DtmLoadError::UnexpectedBandCount(band_count));
    }

    let transform = dataset
        .geo_transform()
        .map_err(|_| DtmLoadError::MissingGeotransform)?;
    let (width, height) = dataset.raster_size();

    let band = dataset.rasterband(1)?;
    let buffer = band.read_as::<f64>((0, 0), (width, height), (width, height), None)?;

    let mut grid = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            grid[[row, col]] = buffer.data()[row * width + col];
        }
    }

    let x0 = transform[0];
    let px = transform[1];
    let y0 = transform[3];
    let py = transform[5];

    Ok(DtmRaster {
        dtm: Dtm::new(grid, x0, y0, px, py),
        datum,
    })
}

impl Default for Datum {
    fn default() -> Self {
        Datum::Geoid
    }
}
