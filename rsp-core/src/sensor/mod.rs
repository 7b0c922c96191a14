//! Sensor models: RPC rational-polynomial geolocation.

pub mod poly;
pub mod rpc;

pub use rpc::{
    Coeffs, DirectCoefficients, DirectLoc, GroundPoint, InverseCoefficients, InverseLoc,
    Normalization, RationalPolynomial, RpcCoefficients, RpcDirection, RpcModel,
};
