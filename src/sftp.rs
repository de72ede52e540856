use crate::config::Sftp;
use crate::error::Result;
use crate::Episode;

use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::Path;

use ssh2::Session;

pub struct Client {
    sftp: ssh2::Sftp,
    remote_dir: String,
}

impl Client {
    pub fn connect(cfg: &Sftp) -> Result<Self> {
        let tcp = TcpStream::connect((cfg.host.as_str(), cfg.port))?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.handshake()?;
        authenticate(&session, cfg)?;

        // The sftp channel keeps the underlying session alive.
        let sftp = session.sftp()?;
        Ok(Self {
            sftp,
            remote_dir: cfg.remote_dir.clone(),
        })
    }

    pub fn upload(&self, local: &Path, file_name: &str) -> Result<String> {
        let remote = remote_path(&self.remote_dir, file_name);
        let mut source = File::open(local)?;
        let mut target = self.sftp.create(Path::new(&remote))?;
        io::copy(&mut source, &mut target)?;
        Ok(remote)
    }
}

/// Credential handling is confined to this seam.
fn authenticate(session: &Session, cfg: &Sftp) -> Result<()> {
    session.userauth_password(&cfg.user, &cfg.password)?;
    Ok(())
}

/// Upload the feed (when one was written) and every matching audio file to
/// the flat remote directory. The first error aborts the remaining
/// transfers for this run.
pub fn publish(cfg: &Sftp, feed_file: Option<&Path>, episodes: &[Episode]) -> Result<()> {
    let client = Client::connect(cfg)?;

    match feed_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            client.upload(path, &file_name)?;
        }
        None => log::warn!("No feed file was written, uploading audio files only"),
    }

    for episode in episodes {
        let remote = client.upload(&episode.path, &episode.file_name)?;
        log::info!("Uploaded {} to {remote}", episode.file_name);
    }

    Ok(())
}

fn remote_path(remote_dir: &str, file_name: &str) -> String {
    format!("{}/{}", remote_dir.trim_end_matches('/'), file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_layout_is_flat() {
        assert_eq!(remote_path("/srv/podcast", "Folge 1.mp3"), "/srv/podcast/Folge 1.mp3");
        assert_eq!(remote_path("/srv/podcast/", "feed.xml"), "/srv/podcast/feed.xml");
    }
}
