//! Command-line interface
//!
//! clap derive 定义的子命令

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 为截图中的游戏角色配音
#[derive(Parser, Debug)]
#[command(name = "scenevoice", version, about = "Speak game dialogue with a stable voice per character")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a single screenshot and speak its dialogue
    Image {
        /// Screenshot to analyze
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Write the audio to this file (or into this directory)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Clear the provider's ledger and voice pool first
        #[arg(long)]
        clear_cache: bool,

        /// Do not play the audio
        #[arg(long)]
        no_play: bool,
    },

    /// Wait for the trigger key and speak the current screen each time
    Listen {
        /// Clear the provider's ledger and voice pool first
        #[arg(long)]
        clear_cache: bool,
    },

    /// Clear the provider's ledger and voice pool, then exit
    ClearCache,

    /// List the current provider's voice pool
    Voices,
}

impl Commands {
    pub fn clear_cache_first(&self) -> bool {
        match self {
            Commands::Image { clear_cache, .. } | Commands::Listen { clear_cache } => *clear_cache,
            Commands::ClearCache => true,
            Commands::Voices => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_command() {
        let cli = Cli::try_parse_from([
            "scenevoice",
            "image",
            "shot.png",
            "-o",
            "out.mp3",
            "--clear-cache",
        ])
        .unwrap();
        match cli.command {
            Commands::Image {
                path,
                output,
                clear_cache,
                no_play,
            } => {
                assert_eq!(path, PathBuf::from("shot.png"));
                assert_eq!(output, Some(PathBuf::from("out.mp3")));
                assert!(clear_cache);
                assert!(!no_play);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["scenevoice", "listen", "--config", "custom.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(!cli.command.clear_cache_first());
    }

    #[test]
    fn test_clear_cache_flags() {
        let cli = Cli::try_parse_from(["scenevoice", "clear-cache"]).unwrap();
        assert!(cli.command.clear_cache_first());

        let cli = Cli::try_parse_from(["scenevoice", "listen", "--clear-cache"]).unwrap();
        assert!(cli.command.clear_cache_first());
    }

    #[test]
    fn test_image_requires_path() {
        assert!(Cli::try_parse_from(["scenevoice", "image"]).is_err());
    }
}
