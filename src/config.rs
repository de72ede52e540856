use std::fs::read_to_string;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub youtube: Youtube,
    pub rss: Rss,
    pub ffmpeg: Ffmpeg,
    pub sftp: Sftp,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Youtube {
    pub url: Url,
    pub output_dir: PathBuf,
    pub filter_keyword: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Rss {
    pub base_url: Url,
    pub rss_file: PathBuf,
    pub icon_url: Url,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ffmpeg {
    pub path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(try_from = "RawSftp")]
pub struct Sftp {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub remote_dir: String,
}

impl TryFrom<RawSftp> for Sftp {
    type Error = std::io::Error;

    fn try_from(value: RawSftp) -> Result<Self, Self::Error> {
        let password = match value.password {
            SftpPassword::Raw { password } => password,
            SftpPassword::File { password_file } => {
                read_to_string(password_file)?.trim().to_string()
            }
        };
        Ok(Sftp {
            host: value.host,
            port: value.port,
            user: value.user,
            password,
            remote_dir: value.remote_dir,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawSftp {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(flatten)]
    pub password: SftpPassword,
    pub remote_dir: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SftpPassword {
    Raw { password: String },
    File { password_file: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn sample_config(sftp_auth: &str) -> String {
        format!(
            r#"
youtube:
  url: "https://www.youtube.com/@kochenimtal"
  output_dir: "audio"
  filter_keyword: "Folge"
rss:
  base_url: "https://podcast.example.org/"
  rss_file: "feed.xml"
  icon_url: "https://podcast.example.org/icon.png"
ffmpeg:
  path: "/usr/bin/ffmpeg"
sftp:
  host: "files.example.org"
  port: 22
  user: "podcast"
  {sftp_auth}
  remote_dir: "/srv/podcast"
"#
        )
    }

    #[test]
    fn parses_full_config() {
        let cfg: Config = serde_yaml::from_str(&sample_config(r#"password: "hunter2""#)).unwrap();

        assert_eq!(cfg.youtube.filter_keyword, "Folge");
        assert_eq!(cfg.youtube.output_dir, PathBuf::from("audio"));
        assert_eq!(cfg.rss.base_url.as_str(), "https://podcast.example.org/");
        assert_eq!(cfg.ffmpeg.path, PathBuf::from("/usr/bin/ffmpeg"));
        assert_eq!(cfg.sftp.port, 22);
        assert_eq!(cfg.sftp.password, "hunter2");
        assert_eq!(cfg.sftp.remote_dir, "/srv/podcast");
    }

    #[test]
    fn reads_password_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hunter2").unwrap();

        let auth = format!(r#"password_file: "{}""#, file.path().display());
        let cfg: Config = serde_yaml::from_str(&sample_config(&auth)).unwrap();

        assert_eq!(cfg.sftp.password, "hunter2");
    }

    #[test]
    fn rejects_missing_keys() {
        let without_password = sample_config("");
        assert!(serde_yaml::from_str::<Config>(&without_password).is_err());

        let without_section = sample_config(r#"password: "hunter2""#).replace("ffmpeg:", "tools:");
        assert!(serde_yaml::from_str::<Config>(&without_section).is_err());
    }
}
