// build.rs
//
// Stamps the build time into build_info.rs so the startup banner can
// report which binary is running on the device.

use chrono::Utc;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    fs::write(
        out_dir.join("build_info.rs"),
        format!("pub const BUILD_DATE: &str = \"{}\";\n", build_date),
    )?;

    // only rerun when this script changes, otherwise every build restamps
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
