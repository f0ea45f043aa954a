use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bathy_core::source::CatalogSource;
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Catalog directory (or its catalog.toml)
    pub catalog: PathBuf,

    /// Only list the scenes of this collection
    #[arg(long)]
    pub collection: Option<String>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let source = CatalogSource::open(&args.catalog)
        .with_context(|| format!("Failed to open catalog {}", args.catalog.display()))?;
    let index = source.index();

    println!("Catalog:     {}", source.root().display());
    println!("Collections: {}", index.collections.len());

    let selected: Vec<_> = match args.collection {
        Some(ref id) => match index.collection(id) {
            Some(c) => vec![c],
            None => bail!("Collection '{id}' not found in catalog"),
        },
        None => index.collections.iter().collect(),
    };

    for collection in selected {
        println!();
        println!("{} ({} scenes)", collection.id, collection.scenes.len());
        if let Some(ref desc) = collection.description {
            println!("  {desc}");
        }
        for scene in &collection.scenes {
            let bands: Vec<&str> = scene.bands.iter().map(|b| b.name.as_str()).collect();
            println!(
                "  {:<32} {}  cloud {:>5.1}%  cell {:>6.1}  bands {}",
                scene.id,
                scene.date.format("%Y-%m-%d"),
                scene.cloud_cover,
                scene.transform.cell_size(),
                bands.join(",")
            );
        }
    }

    Ok(())
}
