use youtube_podcast::config::Config;
use youtube_podcast::download::{self, YTDLP_BIN};
use youtube_podcast::error::Error;
use youtube_podcast::{feed, sftp};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

/// Parse args
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[clap(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("youtube_podcast"), log::LevelFilter::Info)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    let args = Args::parse();

    if which::which(YTDLP_BIN).is_err() {
        log::error!(
            "{YTDLP_BIN} was not found on PATH, install it from https://github.com/yt-dlp/yt-dlp"
        );
        std::process::exit(1);
    }

    let cfg = load_config(&args.config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    // Feed building and publishing only run when the download batch as a
    // whole went through; per-item failures were already logged and skipped.
    if let Err(err) = runtime.block_on(download::download_audio(&cfg)) {
        log::error!("Error downloading audio: {err}");
        return Ok(());
    }

    let episodes = match feed::matching_files(&cfg.youtube.output_dir, &cfg.youtube.filter_keyword)
    {
        Ok(episodes) => episodes,
        Err(err) => {
            log::error!("Error listing audio files: {err}");
            Vec::new()
        }
    };

    let feed_file = match feed::create_feed(&cfg.rss, &episodes) {
        Ok(Some(path)) => {
            log::info!("RSS feed created: {}", path.display());
            Some(path)
        }
        Ok(None) => None,
        Err(err) => {
            log::error!("Error creating RSS feed: {err}");
            None
        }
    };

    if feed_file.is_none() && episodes.is_empty() {
        log::warn!("Nothing to publish");
        return Ok(());
    }

    if let Err(err) = sftp::publish(&cfg.sftp, feed_file.as_deref(), &episodes) {
        log::error!("SFTP upload failed: {err}");
    } else {
        log::info!("SFTP upload completed.");
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config, Error> {
    let file = fs::read_to_string(path)
        .map_err(|err| Error::Config(format!("failed to open config file {path:?}: {err}")))?;

    let cfg: Config = serde_yaml::from_str(&file)
        .map_err(|err| Error::Config(format!("config file is invalid: {err}")))?;

    ensure_exists(&cfg.youtube.output_dir)?;

    Ok(cfg)
}

fn ensure_exists(dir: &Path) -> Result<(), Error> {
    let exists = dir
        .try_exists()
        .map_err(|err| Error::Config(format!("couldn't access directory {dir:?}: {err}")))?;

    if !exists {
        log::info!("Creating directory {dir:?}");
        fs::create_dir_all(dir)
            .map_err(|err| Error::Config(format!("unable to create directory {dir:?}: {err}")))?;
    }

    Ok(())
}
