//! List known episodes.

use framereel_common::config::PipelineConfig;
use framereel_workspace::EpisodeCatalog;

pub fn run(config: &PipelineConfig) -> anyhow::Result<()> {
    let catalog = EpisodeCatalog::new(&config.episodes_dir);
    let episodes = catalog.list();

    if episodes.is_empty() {
        println!("No episodes in {}", catalog.dir().display());
        return Ok(());
    }

    println!("Episodes in {}:", catalog.dir().display());
    for name in &episodes {
        println!("  {name}");
    }
    Ok(())
}
