use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=link.ld");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "none" => {
            let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
            println!("cargo:rustc-link-arg-bins=-T{}/link.ld", manifest_dir);
        }
        // hosted compile check: there is no libc startup code to run
        "linux" => println!("cargo:rustc-link-arg-bins=-nostartfiles"),
        _ => {}
    }
}
