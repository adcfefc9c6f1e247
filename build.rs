use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Floor models and the sky HDR are large, only copy when they change.
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    // Fallback asset root for native runs started outside the crate directory.
    println!(
        "cargo:rustc-env=FLOOR_VIEWER_ASSET_DIR={}",
        assets_src.display()
    );

    if assets_src.exists() {
        let out_dir = env::var("OUT_DIR")?;
        let mut copy_options = CopyOptions::new();
        copy_options.overwrite = true;
        copy_items(&[assets_src], out_dir, &copy_options)?;
    }

    Ok(())
}
