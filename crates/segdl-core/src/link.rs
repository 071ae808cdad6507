//! Link classification: which links go to the external video downloader.

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Plain HTTP(S) resource, fetched by this engine.
    Direct,
    Youtube,
    Instagram,
    /// Audio track page; resolved elsewhere to a video link, converted to audio after download.
    Spotify,
}

impl LinkKind {
    /// Links handled by the external video downloader rather than the range engine.
    pub fn is_streaming_video(self) -> bool {
        matches!(self, LinkKind::Youtube | LinkKind::Instagram)
    }
}

pub trait LinkClassifier: Send + Sync {
    fn classify(&self, link: &str) -> LinkKind;
}

/// Classifies by host name. Anything unparseable or unknown is `Direct`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostClassifier;

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];
const INSTAGRAM_HOSTS: &[&str] = &["instagram.com", "instagr.am"];
const SPOTIFY_HOSTS: &[&str] = &["open.spotify.com", "spotify.com"];

fn host_matches(host: &str, domains: &[&str]) -> bool {
    domains
        .iter()
        .any(|d| host == *d || host.strip_suffix(d).map(|p| p.ends_with('.')).unwrap_or(false))
}

impl LinkClassifier for HostClassifier {
    fn classify(&self, link: &str) -> LinkKind {
        let Ok(url) = Url::parse(link.trim()) else {
            return LinkKind::Direct;
        };
        let Some(host) = url.host_str().map(|h| h.to_ascii_lowercase()) else {
            return LinkKind::Direct;
        };
        if host_matches(&host, YOUTUBE_HOSTS) {
            LinkKind::Youtube
        } else if host_matches(&host, INSTAGRAM_HOSTS) {
            LinkKind::Instagram
        } else if host_matches(&host, SPOTIFY_HOSTS) {
            LinkKind::Spotify
        } else {
            LinkKind::Direct
        }
    }
}
