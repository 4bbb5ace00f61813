use std::env;
use std::path::PathBuf;

const LIBRARY_DIR_VARIABLE: &str = "GOBJECT_LIB_DIR";
const VIPS_HOME_VARIABLE: &str = "VIPSHOME";

fn main() {
    // Make sure the build script is re-run if our env variables are changed.
    println!("cargo:rerun-if-env-changed={}", LIBRARY_DIR_VARIABLE);
    println!("cargo:rerun-if-env-changed={}", VIPS_HOME_VARIABLE);

    // Nothing to link unless the real entry points were requested.
    if env::var("CARGO_FEATURE_GOBJECT_FUNCTIONS").is_err() {
        return;
    }

    // Library directory override, or the directory of a libvips distribution.
    if let Ok(dir) = env::var(LIBRARY_DIR_VARIABLE) {
        println!("cargo:rustc-link-search=native={}", dir);
    } else if let Some(dir) = get_vips_library_dir() {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    println!("cargo:rustc-link-lib=gobject-2.0");
    println!("cargo:rustc-link-lib=glib-2.0");
}

// Returns the lib dir of a libvips distribution.
// The Windows binaries set %VIPSHOME% to the unpacked archive and ship GLib next to libvips.
fn get_vips_library_dir() -> Option<String> {
    let home = env::var(VIPS_HOME_VARIABLE).ok()?;

    let mut path = PathBuf::from(home);
    path.push("lib");
    path.to_str().map(|s| s.to_owned())
}
