pub mod dtm;
pub mod error;
pub mod localization;
pub mod sensor;

pub use dtm::Dtm;
pub use error::{CoordinateError, DtmError, ProjectionError, Result, RpcError, RspError};
pub use localization::Localization;
pub use sensor::rpc::{
    Coeffs, DirectCoefficients, DirectLoc, GroundPoint, InverseCoefficients, InverseLoc,
    Normalization, RationalPolynomial, RpcCoefficients, RpcDirection, RpcModel,
};
