use std::env;
use std::path::PathBuf;

const WATCHED_VARIABLES: [&str; 4] = [
    "FFMPEG_DIR",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // ffmpeg-sys-next finds FFmpeg via pkg-config everywhere except Windows,
    // where an explicit FFMPEG_DIR (usually a vcpkg tree) is needed.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=vidmark: FFMPEG_DIR is not set; point it at an FFmpeg install \
             (e.g. a vcpkg triplet directory)."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate: PathBuf = [vcpkg_root.as_str(), "installed", triplet.as_str()]
        .iter()
        .collect();

    if candidate.exists() {
        println!(
            "cargo:warning=vidmark: found vcpkg FFmpeg at {0}; \
             set FFMPEG_DIR={0} to use it explicitly.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=vidmark: VCPKG_ROOT is set but {} does not exist.",
            candidate.display()
        );
    }
}
