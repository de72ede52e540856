use crate::config::Rss;
use crate::error::{Error, Result};
use crate::{Episode, AUDIO_EXT};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rss::extension::ExtensionBuilder;
use rss::{Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, ImageBuilder, Item, ItemBuilder};
use url::Url;

const CHANNEL_TITLE: &str = "Kochen im Tal - Dumm gefragt";
const CHANNEL_DESCRIPTION: &str =
    "Automatically generated podcast from the 'Dumm gefragt' series";
const CHANNEL_LANGUAGE: &str = "de";

const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Audio files whose name contains the keyword, sorted by filename so the
/// feed comes out identical on every run over an unchanged directory.
pub fn matching_files(dir: &Path, keyword: &str) -> Result<Vec<Episode>> {
    let suffix = format!(".{AUDIO_EXT}");
    let mut episodes = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(title) = file_name.strip_suffix(&suffix) else {
            continue;
        };
        if !file_name.contains(keyword) {
            continue;
        }
        episodes.push(Episode {
            title: title.to_string(),
            file_name: file_name.clone(),
            path: entry.path(),
        });
    }

    episodes.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(episodes)
}

/// Build and write the feed. Returns the feed path, or `None` when there was
/// nothing to describe and no file was written.
pub fn create_feed(cfg: &Rss, episodes: &[Episode]) -> Result<Option<PathBuf>> {
    if episodes.is_empty() {
        log::info!("No matching audio files found. RSS feed will not be created.");
        return Ok(None);
    }

    let channel = build_channel(cfg, episodes);
    write_feed(&channel, &cfg.rss_file)?;
    Ok(Some(cfg.rss_file.clone()))
}

fn build_channel(cfg: &Rss, episodes: &[Episode]) -> Channel {
    let image = ImageBuilder::default()
        .url(cfg.icon_url.to_string())
        .title(CHANNEL_TITLE)
        .link(cfg.base_url.to_string())
        .build();

    let items = episodes
        .iter()
        .map(|episode| {
            let duration = read_duration(&episode.path).unwrap_or_else(|err| {
                log::error!("{err}");
                0
            });
            let pub_date = read_pub_date(&episode.path).unwrap_or_else(|err| {
                log::error!("{err}");
                format_pub_date(SystemTime::now())
            });
            let length = fs::metadata(&episode.path).map(|m| m.len()).unwrap_or(0);
            episode_item(episode, &cfg.base_url, duration, length, pub_date)
        })
        .collect::<Vec<_>>();

    ChannelBuilder::default()
        .title(CHANNEL_TITLE)
        .link(cfg.base_url.to_string())
        .description(CHANNEL_DESCRIPTION)
        .language(Some(CHANNEL_LANGUAGE.to_string()))
        .image(Some(image))
        .items(items)
        .build()
}

fn episode_item(
    episode: &Episode,
    base_url: &Url,
    duration_secs: u64,
    length: u64,
    pub_date: String,
) -> Item {
    // The enclosure URL is base URL + filename, and doubles as the guid.
    let enclosure_url = format!("{base_url}{}", episode.file_name);

    let enclosure = EnclosureBuilder::default()
        .url(enclosure_url.clone())
        .mime_type("audio/mpeg")
        .length(length.to_string())
        .build();

    let guid = GuidBuilder::default()
        .value(enclosure_url)
        .permalink(true)
        .build();

    // Bare <duration> element, the way established feed consumers of this
    // podcast already expect it.
    let duration = ExtensionBuilder::default()
        .name("duration")
        .value(Some(duration_secs.to_string()))
        .build();
    let mut extensions = rss::extension::ExtensionMap::default();
    extensions.insert(
        "duration".to_string(),
        BTreeMap::from([("duration".to_string(), vec![duration])]),
    );

    ItemBuilder::default()
        .title(Some(episode.title.clone()))
        .enclosure(Some(enclosure))
        .guid(Some(guid))
        .pub_date(Some(pub_date))
        .extensions(extensions)
        .build()
}

fn write_feed(channel: &Channel, path: &Path) -> Result<()> {
    let mut out = Vec::from(&br#"<?xml version="1.0" encoding="utf-8"?>"#[..]);
    out.push(b'\n');
    channel
        .write_to(&mut out)
        .map_err(|err| Error::Feed(err.to_string()))?;
    fs::write(path, out)?;
    Ok(())
}

fn read_duration(path: &Path) -> Result<u64> {
    let duration = mp3_duration::from_path(path).map_err(|err| Error::Metadata {
        path: path.to_owned(),
        message: err.to_string(),
    })?;
    Ok(duration.as_secs())
}

fn read_pub_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|err| Error::Metadata {
            path: path.to_owned(),
            message: err.to_string(),
        })?;
    Ok(format_pub_date(modified))
}

fn format_pub_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(PUB_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::time::Duration;

    fn episode(dir: &Path, file_name: &str) -> Episode {
        Episode {
            title: file_name.trim_end_matches(".mp3").to_string(),
            file_name: file_name.to_string(),
            path: dir.join(file_name),
        }
    }

    fn rss_config(dir: &Path) -> Rss {
        Rss {
            base_url: Url::parse("https://podcast.example.org/").unwrap(),
            rss_file: dir.join("feed.xml"),
            icon_url: Url::parse("https://podcast.example.org/icon.png").unwrap(),
        }
    }

    #[test]
    fn matching_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("Folge 2.mp3")).unwrap();
        File::create(dir.path().join("Folge 1.mp3")).unwrap();
        File::create(dir.path().join("Intro.mp3")).unwrap();
        File::create(dir.path().join("Folge notes.txt")).unwrap();

        let episodes = matching_files(dir.path(), "Folge").unwrap();

        let names: Vec<_> = episodes.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["Folge 1.mp3", "Folge 2.mp3"]);
        assert_eq!(episodes[0].title, "Folge 1");
    }

    #[test]
    fn pub_date_is_rfc822_utc() {
        // 2024-01-01T10:00:00Z
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_103_200);
        assert_eq!(format_pub_date(mtime), "Mon, 01 Jan 2024 10:00:00 GMT");
    }

    #[test]
    fn item_carries_enclosure_guid_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        let episode = episode(dir.path(), "Folge 1.mp3");
        let base_url = Url::parse("https://podcast.example.org/").unwrap();

        let item = episode_item(
            &episode,
            &base_url,
            754,
            1024,
            "Mon, 01 Jan 2024 10:00:00 GMT".to_string(),
        );

        assert_eq!(item.title(), Some("Folge 1"));
        let enclosure = item.enclosure().unwrap();
        assert_eq!(enclosure.url(), "https://podcast.example.org/Folge 1.mp3");
        assert_eq!(enclosure.mime_type(), "audio/mpeg");
        assert_eq!(enclosure.length(), "1024");
        assert_eq!(item.guid().unwrap().value(), "https://podcast.example.org/Folge 1.mp3");
        assert_eq!(item.pub_date(), Some("Mon, 01 Jan 2024 10:00:00 GMT"));

        let xml = ChannelBuilder::default()
            .title("t")
            .link("l")
            .description("d")
            .items(vec![item])
            .build()
            .to_string();
        assert!(xml.contains("<duration>754</duration>"));
        assert!(xml.contains("<pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>"));
    }

    #[test]
    fn channel_has_fixed_metadata_and_one_item_per_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Folge 1.mp3"), b"not really audio").unwrap();
        fs::write(dir.path().join("Folge 2.mp3"), b"not really audio").unwrap();

        let cfg = rss_config(dir.path());
        let episodes = matching_files(dir.path(), "Folge").unwrap();
        let channel = build_channel(&cfg, &episodes);

        assert_eq!(channel.title(), CHANNEL_TITLE);
        assert_eq!(channel.language(), Some(CHANNEL_LANGUAGE));
        assert_eq!(channel.image().unwrap().url(), "https://podcast.example.org/icon.png");
        assert_eq!(channel.items().len(), 2);
        // Junk bytes are not an mp3; the item must still appear, duration 0.
        assert!(channel.to_string().contains("<duration>0</duration>"));
    }

    #[test]
    fn no_matching_files_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = rss_config(dir.path());

        let written = create_feed(&cfg, &[]).unwrap();

        assert!(written.is_none());
        assert!(!cfg.rss_file.exists());
    }

    #[test]
    fn feed_file_round_trips_with_declaration() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Folge 1.mp3"), b"not really audio").unwrap();

        let cfg = rss_config(dir.path());
        let episodes = matching_files(dir.path(), "Folge").unwrap();
        let written = create_feed(&cfg, &episodes).unwrap().unwrap();

        let bytes = fs::read(&written).unwrap();
        assert!(bytes.starts_with(br#"<?xml version="1.0" encoding="utf-8"?>"#));

        let channel = Channel::read_from(&bytes[..]).unwrap();
        assert_eq!(channel.items().len(), 1);
        assert_eq!(channel.items()[0].title(), Some("Folge 1"));
    }
}
