use std::time::Duration;

use log::debug;

use crate::{
    bounded, PlaylistError, PlaylistId, PlaylistService, Provider, Removal, RemoteTrack, TrackRef,
};

/// A track in a snapshot, along with its display name if the service reported one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub track: TrackRef,
    pub name: Option<String>,
    /// Where the entry sits in the remote playlist
    pub position: usize,
}

impl PlaylistEntry {
    pub fn new(track: TrackRef) -> Self {
        Self {
            track,
            name: None,
            position: 0,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// The display name, falling back to the URI.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.track.uri())
    }
}

/// The contents of a playlist at the moment it was read, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    entries: Vec<PlaylistEntry>,
    snapshot_id: Option<String>,
}

impl PlaylistSnapshot {
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        Self {
            entries,
            snapshot_id: None,
        }
    }

    pub fn with_snapshot_id(mut self, snapshot_id: Option<String>) -> Self {
        self.snapshot_id = snapshot_id;
        self
    }

    /// Builds a snapshot from what the service reported.
    ///
    /// Entries are normalized to canonical URIs. Anything that isn't a track of the
    /// given provider, such as a local file, is left out.
    pub fn from_remote(provider: &Provider, tracks: Vec<RemoteTrack>) -> Self {
        let entries = tracks
            .into_iter()
            .filter_map(|remote| {
                let track = TrackRef::from_uri(provider, &remote.uri).or_else(|| {
                    remote
                        .id
                        .as_deref()
                        .filter(|_| remote.uri.is_empty())
                        .and_then(|id| TrackRef::new(provider, id))
                });

                match track {
                    Some(track) => Some(PlaylistEntry {
                        track,
                        name: remote.name,
                        position: remote.position,
                    }),
                    None => {
                        debug!("Leaving {:?} out of the snapshot", remote.uri);
                        None
                    }
                }
            })
            .collect();

        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    /// The first entry, which is the oldest under insertion order.
    pub fn oldest(&self) -> Option<&PlaylistEntry> {
        self.entries.first()
    }

    /// Returns true if the track is anywhere in the snapshot.
    pub fn contains(&self, track: &TrackRef) -> bool {
        self.entries.iter().any(|e| e.track.uri() == track.uri())
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    /// Describes the removal of exactly this entry, as of this snapshot.
    pub fn removal(&self, entry: &PlaylistEntry) -> Removal {
        Removal {
            uri: entry.track.uri().to_string(),
            position: entry.position,
            snapshot_id: self.snapshot_id.clone(),
        }
    }
}

/// Reads the full, ordered contents of a playlist, one page at a time.
///
/// Each page is bounded by `page_timeout` on its own, so long playlists don't time out
/// as a whole. The snapshot id of the first page is kept.
pub async fn fetch_snapshot(
    service: &dyn PlaylistService,
    playlist: &PlaylistId,
    provider: &Provider,
    page_timeout: Duration,
) -> Result<PlaylistSnapshot, PlaylistError> {
    let mut tracks = Vec::new();
    let mut snapshot_id = None;
    let mut offset = Some(0);

    while let Some(current) = offset.take() {
        let page = bounded(page_timeout, service.playlist_page(playlist, current)).await?;

        debug!(
            "Read {} tracks of {} at offset {}",
            page.tracks.len(),
            playlist,
            current
        );

        snapshot_id = snapshot_id.or(page.snapshot_id);
        // A page that doesn't move forward would be read forever
        offset = page.next.filter(|next| *next > current);
        tracks.extend(page.tracks);
    }

    Ok(PlaylistSnapshot::from_remote(provider, tracks).with_snapshot_id(snapshot_id))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Call, MemoryPlaylist};

    fn remote(uri: &str) -> RemoteTrack {
        RemoteTrack::new(uri)
    }

    #[test]
    fn test_from_remote_normalizes() {
        let provider = Provider::spotify();
        let snapshot = PlaylistSnapshot::from_remote(
            &provider,
            vec![
                remote("spotify:track:abc").with_name("Song A"),
                remote(" SPOTIFY:Track:def "),
                remote("spotify:local:Artist:Album:Title:200"),
                remote("spotify:episode:xyz"),
            ],
        );

        let uris: Vec<_> = snapshot.entries().iter().map(|e| e.track.uri()).collect();

        assert_eq!(uris, vec!["spotify:track:abc", "spotify:track:def"]);
        assert_eq!(snapshot.oldest().unwrap().label(), "Song A");
        assert_eq!(snapshot.entries()[1].label(), "spotify:track:def");
    }

    #[test]
    fn test_from_remote_falls_back_to_id() {
        let provider = Provider::spotify();
        let snapshot = PlaylistSnapshot::from_remote(
            &provider,
            vec![RemoteTrack {
                id: Some("abc".to_string()),
                ..RemoteTrack::new("")
            }],
        );

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries()[0].track.uri(), "spotify:track:abc");
    }

    #[test]
    fn test_contains_by_canonical_uri() {
        let provider = Provider::spotify();
        let snapshot =
            PlaylistSnapshot::from_remote(&provider, vec![remote("Spotify:track:abc")]);

        assert!(snapshot.contains(&TrackRef::new(&provider, "abc").unwrap()));
        assert!(!snapshot.contains(&TrackRef::new(&provider, "ABC").unwrap()));
    }

    #[test]
    fn test_positions_survive_filtering() {
        let provider = Provider::spotify();
        let snapshot = PlaylistSnapshot::from_remote(
            &provider,
            vec![
                remote("spotify:episode:xyz").at(0),
                remote("spotify:track:abc").at(1),
                remote("spotify:track:abc").at(2),
            ],
        )
        .with_snapshot_id(Some("rev7".to_string()));

        let oldest = snapshot.oldest().unwrap();

        assert_eq!(oldest.position, 1);
        assert_eq!(
            snapshot.removal(oldest),
            Removal {
                uri: "spotify:track:abc".to_string(),
                position: 1,
                snapshot_id: Some("rev7".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_reads_every_page() {
        let provider = Provider::spotify();
        let uris: Vec<String> = (0..5).map(|i| format!("spotify:track:t{i}")).collect();
        let playlist = MemoryPlaylist::with_uris(&uris).pages_of(2);

        let snapshot = fetch_snapshot(
            &playlist,
            &PlaylistId::new("playlist"),
            &provider,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let read: Vec<_> = snapshot.entries().iter().map(|e| e.track.uri()).collect();
        let positions: Vec<_> = snapshot.entries().iter().map(|e| e.position).collect();

        assert_eq!(read, uris);
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
        assert_eq!(playlist.calls(), vec![Call::Read; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_applies_per_page() {
        let provider = Provider::spotify();
        let uris: Vec<String> = (0..4).map(|i| format!("spotify:track:t{i}")).collect();
        let playlist = MemoryPlaylist::with_uris(&uris).pages_of(1);
        playlist.delay_reads(Duration::from_secs(3));

        // Four pages take twelve seconds, but none takes more than five
        let snapshot = fetch_snapshot(
            &playlist,
            &PlaylistId::new("playlist"),
            &provider,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(snapshot.len(), 4);

        playlist.delay_reads(Duration::from_secs(6));
        let result = fetch_snapshot(
            &playlist,
            &PlaylistId::new("playlist"),
            &provider,
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(result, Err(PlaylistError::Timeout));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PlaylistSnapshot::default();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.oldest(), None);
    }
}
