use anyhow::Context;
use komorebi_core::{config::Config, io, paths, types::Collection};
use std::path::Path;

const FACTS_TEMPLATE: &str = "user: {}\nprojects: {}\n";

/// Scaffold the config file and data directories under `root`.
///
/// Existing files are never overwritten.
pub fn run(root: &Path, config_path: &Path) -> anyhow::Result<()> {
    println!("Initializing Komorebi in: {}", root.display());

    let config = if config_path.exists() {
        println!("  exists:  {}", relative(root, config_path));
        Config::load(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        let config = Config::default();
        config
            .save(config_path)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("  created: {}", relative(root, config_path));
        config
    };

    let data_dir = config.resolve_data_dir(root);
    for collection in Collection::all() {
        let dir = paths::collection_dir(&data_dir, *collection);
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        println!("  dir:     {}", relative(root, &dir));
    }

    let facts = paths::memory_path(&data_dir);
    let created = io::write_if_missing(&facts, FACTS_TEMPLATE.as_bytes())
        .with_context(|| format!("failed to write {}", facts.display()))?;
    let verb = if created { "created:" } else { "exists: " };
    println!("  {verb} {}", relative(root, &facts));

    let projects = paths::collection_dir(&data_dir, Collection::Projects);
    println!(
        "\nDone. Add project notes under {}/ and run `komorebi`.",
        relative(root, &projects)
    );
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
