pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod sftp;

use std::path::PathBuf;

/// File extension of the audio files the whole pipeline deals in.
pub const AUDIO_EXT: &str = "mp3";

/// An audio file in the output directory. The filename stem doubles as the
/// episode title; duration and publication date are read from the file on
/// demand when the feed is built.
#[derive(Debug, Clone)]
pub struct Episode {
    pub title: String,
    pub file_name: String,
    pub path: PathBuf,
}
