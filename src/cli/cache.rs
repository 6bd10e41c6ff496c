use clap::{Parser, Subcommand};

/// Arguments for cache command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show cache statistics:\n    triquetra cache\n\n\
                  List downloaded builds:\n    triquetra cache list\n\n\
                  Clear the whole cache:\n    triquetra cache clear\n\n\
                  Remove one build:\n    triquetra cache clear --only 26100.1742")]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: Option<CacheSubcommand>,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheSubcommand {
    /// List downloaded builds
    List,

    /// Delete downloaded packages
    Clear(ClearCacheArgs),
}

/// Arguments for cache clear command
#[derive(Parser, Debug)]
pub struct ClearCacheArgs {
    /// Remove only one build folder (e.g. 26100.1742, or EP)
    #[arg(long)]
    pub only: Option<String>,
}
