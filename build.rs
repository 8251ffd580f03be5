//! Build script for the transceiver DSP firmware
//!
//! Host builds (tests, `std` feature) need nothing from here. Cortex-M
//! targets get the cortex-m-rt and defmt linker scripts; `memory.x` comes
//! from embassy-stm32's `memory-x` feature.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("thumb") {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
