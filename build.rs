//! Build script for spotishuffler.
//!
//! Places `.env.example` next to where the application looks for its `.env`
//! (`<data_local_dir>/spotishuffler/`), so a fresh install has a template to
//! copy from. The build never fails because of it: an unwritable data
//! directory (sandboxed or CI builds) only produces a cargo warning.

use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=.env.example");
    println!("cargo:rerun-if-env-changed=SPOTISHUFFLER_SKIP_ENV_TEMPLATE");

    if env::var_os("SPOTISHUFFLER_SKIP_ENV_TEMPLATE").is_some() {
        return;
    }

    if let Err(e) = install_env_template() {
        println!("cargo:warning=could not install .env.example: {e}");
    }
}

fn install_env_template() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");
    if !template.is_file() {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
        return Ok(());
    }

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("spotishuffler");
    fs::create_dir_all(&out_dir)?;

    let contents = fs::read_to_string(&template)?;
    let target = out_dir.join(".env.example");
    // leave an identical copy alone so its mtime stays meaningful
    if fs::read_to_string(&target).ok().as_deref() != Some(contents.as_str()) {
        fs::write(target, contents)?;
    }
    Ok(())
}
