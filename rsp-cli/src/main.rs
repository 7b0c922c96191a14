//! Minimal CLI: direct-localize a single pixel using an image's embedded RPC.
//!
//! CLI ergonomics are intentionally out of scope; this exists to keep the
//! workspace member buildable and to give the library a runnable example.

use std::env;
use std::process::ExitCode;

use rsp_io::Image;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: rsp-cli <image-path> <row> <col>");
        return ExitCode::FAILURE;
    }

    let (row, col) = match (args[2].parse::<f64>(), args[3].parse::<f64>()) {
        (Ok(r), Ok(c)) => (r, c),
        _ => {
            eprintln!("row and col must be numbers");
            return ExitCode::FAILURE;
        }
    };

    let image = match Image::open(&args[1]) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("failed to open {}: {e}", args[1]);
            return ExitCode::FAILURE;
        }
    };

    let coeffs = match image.metadata().rpc.clone() {
        Some(c) => c,
        None => {
            eprintln!("{} carries no RPC metadata", args[1]);
            return ExitCode::FAILURE;
        }
    };

    let rpc = rsp_core::RpcModel::new(coeffs);
    let (alt_min, alt_max) = rpc.get_alt_min_max();
    let alt = (alt_min + alt_max) / 2.0;

    let (lon, lat, _) = rpc.direct_loc_h_scalar(row, col, alt, false);
    println!("lon={lon:.9} lat={lat:.9} alt={alt:.3}");
    ExitCode::SUCCESS
}
