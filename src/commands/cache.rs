//! Cache command implementation

use std::path::{Path, PathBuf};

use crate::cache::{self, ArtifactCache};
use crate::cli::{CacheArgs, CacheSubcommand};
use crate::config::{EngineConfig, default_workdir};
use crate::error::Result;

pub fn run(workdir: Option<PathBuf>, args: CacheArgs) -> Result<()> {
    let workdir = match workdir {
        Some(dir) => dir,
        None => default_workdir()?,
    };
    let cache_dir = EngineConfig::with_workdir(workdir)?.cache_dir();

    match args.command {
        Some(CacheSubcommand::List) => list_cached_builds(&cache_dir),
        Some(CacheSubcommand::Clear(clear_args)) => match clear_args.only {
            Some(name) => clean_specific_build(&cache_dir, &name),
            None => clean_all_cache(&cache_dir),
        },
        None => show_cache_stats(&cache_dir),
    }
}

fn print_stats(cache_dir: &Path) -> Result<usize> {
    let stats = cache::cache_stats(cache_dir)?;

    println!("Cache Statistics:");
    println!("  Location: {}", cache_dir.display());
    println!("  Builds: {}", stats.builds);
    println!("  Files: {}", stats.files);
    println!("  Size: {}", stats.formatted_size());
    Ok(stats.builds)
}

fn show_cache_stats(cache_dir: &Path) -> Result<()> {
    if print_stats(cache_dir)? == 0 {
        println!("\nCache is empty.");
    } else {
        println!("\nRun 'triquetra cache list' to list downloaded builds.");
        println!("Run 'triquetra cache clear' to remove everything from cache.");
        println!("Run 'triquetra cache clear --only <build>' to remove a specific build.");
    }
    Ok(())
}

fn list_cached_builds(cache_dir: &Path) -> Result<()> {
    print_stats(cache_dir)?;
    println!();

    let builds = cache::list_cached_builds(cache_dir)?;
    if builds.is_empty() {
        println!("No downloaded builds.");
        return Ok(());
    }

    println!("Downloaded builds ({}):", builds.len());
    for build in &builds {
        println!(
            "  {} [{}] ({} file{}, {})",
            build.name,
            build.arch,
            build.files,
            if build.files == 1 { "" } else { "s" },
            build.formatted_size()
        );
    }
    Ok(())
}

fn clean_all_cache(cache_dir: &Path) -> Result<()> {
    cache::clear_cache(cache_dir)?;
    println!("Cache cleared successfully.");
    Ok(())
}

fn clean_specific_build(cache_dir: &Path, name: &str) -> Result<()> {
    ArtifactCache::new(cache_dir).remove_build(name)?;
    println!("Removed cached build: {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populated() -> TempDir {
        let temp = TempDir::new().unwrap();
        let build = temp.path().join("26100.1742").join("x64");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::write(build.join("ssu.msu"), b"ssu").unwrap();
        temp
    }

    #[test]
    fn test_show_cache_stats_missing_dir() {
        let temp = TempDir::new().unwrap();
        assert!(show_cache_stats(&temp.path().join("cache")).is_ok());
    }

    #[test]
    fn test_list_cached_builds() {
        let temp = populated();
        assert!(list_cached_builds(temp.path()).is_ok());
    }

    #[test]
    fn test_clean_all_cache() {
        let temp = populated();
        clean_all_cache(temp.path()).unwrap();
        assert!(!temp.path().join("26100.1742").exists());
    }

    #[test]
    fn test_clean_specific_build() {
        let temp = populated();
        clean_specific_build(temp.path(), "26100.1742").unwrap();
        assert!(!temp.path().join("26100.1742").exists());
    }

    #[test]
    fn test_clean_specific_build_not_found() {
        let temp = TempDir::new().unwrap();
        let result = clean_specific_build(temp.path(), "22631.9999");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found in cache"));
    }
}
