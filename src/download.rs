use crate::config::Config;
use crate::error::{Error, Result};
use crate::AUDIO_EXT;

use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

pub const YTDLP_BIN: &str = "yt-dlp";

const AUDIO_QUALITY: &str = "192K";

/// One upload discovered on the source channel.
#[derive(Debug, Deserialize)]
struct Candidate {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
}

impl Candidate {
    fn watch_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Fetch,
    AlreadyHave,
    NoMatch,
}

/// Selection rule: fetch iff the title contains the keyword and is not
/// already present on disk.
pub fn classify(title: &str, keyword: &str, existing: &HashSet<String>) -> Selection {
    if !title.contains(keyword) {
        return Selection::NoMatch;
    }
    if existing.contains(title) {
        return Selection::AlreadyHave;
    }
    Selection::Fetch
}

pub async fn download_audio(cfg: &Config) -> Result<()> {
    let existing = existing_titles(&cfg.youtube.output_dir)?;
    let candidates = list_candidates(cfg.youtube.url.as_str()).await?;

    for candidate in candidates {
        match classify(&candidate.title, &cfg.youtube.filter_keyword, &existing) {
            Selection::NoMatch => {
                log::info!("Video skipped: {}", candidate.title);
            }
            Selection::AlreadyHave => {
                log::info!("Skipping already existing file: {}", candidate.title);
            }
            Selection::Fetch => {
                // One failing item must not abort the batch.
                if let Err(err) = fetch_one(cfg, &candidate).await {
                    log::error!("Error downloading `{}`: {err}", candidate.title);
                }
            }
        }
    }

    Ok(())
}

/// Titles already present in the output directory, extension stripped.
fn existing_titles(dir: &Path) -> Result<HashSet<String>> {
    let suffix = format!(".{AUDIO_EXT}");
    let mut titles = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let file_name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(title) = file_name.strip_suffix(&suffix) {
            titles.insert(title.to_string());
        }
    }
    Ok(titles)
}

/// Enumerate the source's uploads without downloading anything. yt-dlp
/// prints one JSON object per entry in flat-playlist mode.
async fn list_candidates(url: &str) -> Result<Vec<Candidate>> {
    let output = Command::new(YTDLP_BIN)
        .args(["--flat-playlist", "--dump-json", "--no-warnings"])
        .arg(url)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| Error::Download(format!("failed to run {YTDLP_BIN}: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Download(format!(
            "{YTDLP_BIN} failed listing `{url}`: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|err| Error::Download(format!("unparseable {YTDLP_BIN} entry: {err}")))
        })
        .collect()
}

/// Download one upload and transcode it to mp3, forwarding yt-dlp's
/// progress lines (percent, rate, ETA) as they arrive.
async fn fetch_one(cfg: &Config, candidate: &Candidate) -> Result<()> {
    let template = cfg.youtube.output_dir.join("%(title)s.%(ext)s");

    let mut child = Command::new(YTDLP_BIN)
        .args(["--format", "bestaudio/best"])
        .args(["--extract-audio", "--audio-format", AUDIO_EXT])
        .args(["--audio-quality", AUDIO_QUALITY])
        .arg("--ffmpeg-location")
        .arg(&cfg.ffmpeg.path)
        .args(["--no-check-certificates", "--ignore-errors", "--newline"])
        .arg("--output")
        .arg(&template)
        .arg(candidate.watch_url())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|err| Error::Download(format!("failed to run {YTDLP_BIN}: {err}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Download(format!("{YTDLP_BIN} stdout was not captured")))?;

    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if line.starts_with("[download]") {
            log::info!("{line}");
        } else {
            log::debug!("{line}");
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(Error::Download(format!(
            "{YTDLP_BIN} exited with {status} for `{}`",
            candidate.title
        )));
    }

    log::info!("Download complete: {}", candidate.title);
    Ok(())
}
