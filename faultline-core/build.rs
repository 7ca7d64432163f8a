use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("constants.gen.rs");
    let mut f = File::create(dest_path).unwrap();

    let target = env::var("TARGET").unwrap();
    let arch = target.split('-').next().unwrap_or("unknown");

    writeln!(f, "/// The rustc version that was used to compile this crate").ok();
    match rustc_version::version() {
        Ok(version) => writeln!(
            f,
            "pub const RUSTC_VERSION: Option<&str> = Some(\"{}\");",
            version
        ),
        Err(_) => writeln!(f, "pub const RUSTC_VERSION: Option<&str> = None;"),
    }
    .ok();

    writeln!(f, "/// The CPU architecture identifier").ok();
    writeln!(f, "pub const ARCH: &str = \"{}\";", arch).ok();

    println!("cargo:rerun-if-changed=build.rs");
}
