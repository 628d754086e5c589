//! Build script for manta-signer
//!
//! With the `zkp` feature, points the linker at `libzkp` when `ZKP_LIB_DIR`
//! is set.

fn main() {
    println!("cargo:rerun-if-env-changed=ZKP_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_ZKP").is_none() {
        return;
    }

    match std::env::var("ZKP_LIB_DIR") {
        Ok(dir) => println!("cargo:rustc-link-search=native={}", dir),
        Err(_) => println!("cargo:warning=ZKP_LIB_DIR not set, relying on the default library path for libzkp"),
    }
}
