/// movevr build script.
///
/// The core (registry, discovery, trampoline) needs nothing from the build
/// script.  Only the `xplm` feature on Windows has to link against the SDK's
/// import library; Linux and macOS resolve XPLM symbols when X-Plane loads the
/// plugin.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=XPLM_SDK_LIBS");

    let xplm = std::env::var_os("CARGO_FEATURE_XPLM").is_some();
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    if !xplm {
        return;
    }

    match target_os.as_str() {
        "windows" => {
            // XPLM_SDK_LIBS points at `SDK/Libraries/Win` (XPLM_64.lib).
            // Fail loudly rather than producing a plugin that cannot load.
            let Ok(dir) = std::env::var("XPLM_SDK_LIBS") else {
                panic!(
                    "feature `xplm` on Windows needs XPLM_SDK_LIBS \
                     (path to the X-Plane SDK's Libraries/Win directory)"
                );
            };
            println!("cargo:rustc-link-search=native={dir}");
        }
        "macos" => {
            // Undefined XPLM symbols are bound by X-Plane at load time.
            println!("cargo:rustc-cdylib-link-arg=-undefined");
            println!("cargo:rustc-cdylib-link-arg=dynamic_lookup");
        }
        _ => {}
    }
}
