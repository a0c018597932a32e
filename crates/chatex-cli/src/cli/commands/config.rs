//! `chatex config` – show where config lives and what is in effect.

use anyhow::Result;
use chatex_core::config;

pub fn run_config() -> Result<()> {
    let path = config::config_path()?;
    let cfg = config::load_or_init()?;
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}
