//! `secret-fills known-ids` and `secret-fills exclude`

use anyhow::{Context, Result};

use secretfills_core::{known_ids, searcher::create_searcher, validate_config, Config};

use super::create_spinner;
use crate::args::{ExcludeArgs, KnownIdsArgs};

pub async fn save_known_ids(mut config: Config, args: KnownIdsArgs) -> Result<()> {
    if let Some(backend) = args.backend {
        config.search.backend = backend.into();
    }
    validate_config(&config).context("Configuration validation failed")?;

    let searcher = create_searcher(&config).context("Failed to create searcher")?;
    let spinner = create_spinner("Listing playlist", false);
    let ids = searcher
        .playlist_ids(&args.playlist)
        .await
        .with_context(|| format!("Failed to list playlist {}", args.playlist));
    spinner.finish_and_clear();
    let ids = ids?;

    let output = args
        .output
        .unwrap_or_else(|| config.storage.known_ids_path.clone());
    known_ids::save_ids(&output, &ids)
        .with_context(|| format!("Failed to save ids to {:?}", output))?;

    println!("Saved {} ids to {}", ids.len(), output.display());
    Ok(())
}

pub fn exclude(config: &Config, args: ExcludeArgs) -> Result<()> {
    let path = args
        .exclude_ids
        .unwrap_or_else(|| config.storage.exclude_ids_path.clone());

    let added = known_ids::append_ids(&path, &args.ids)
        .with_context(|| format!("Failed to update exclusion list {:?}", path))?;

    println!(
        "Added {} of {} ids to {}",
        added,
        args.ids.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_appends_new_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exclude_ids.txt");
        std::fs::write(&path, "old\n").unwrap();

        let args = ExcludeArgs {
            ids: vec!["old".to_string(), "new".to_string()],
            exclude_ids: Some(path.clone()),
        };
        exclude(&Config::default(), args).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }
}
