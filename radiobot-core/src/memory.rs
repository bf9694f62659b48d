use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{PlaylistError, PlaylistId, PlaylistPage, PlaylistService, Removal, RemoteTrack};

/// A call made against a [MemoryPlaylist].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// A page was read.
    Read,
    Remove { uri: String, position: usize },
    Append(String),
}

/// An in-memory playlist service, recording every call made against it.
///
/// Reads, removals, and appends can each be made to fail, which makes it useful for
/// exercising the bridge without a real service.
#[derive(Default)]
pub struct MemoryPlaylist {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    tracks: Vec<RemoteTrack>,
    calls: Vec<Call>,
    page_size: Option<usize>,
    peak_len: usize,

    hang_reads: bool,
    read_delay: Option<Duration>,
    read_error: Option<PlaylistError>,
    remove_error: Option<PlaylistError>,
    append_error: Option<PlaylistError>,
}

impl MemoryPlaylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tracks(tracks: Vec<RemoteTrack>) -> Self {
        let playlist = Self::default();
        {
            let mut state = playlist.state.lock();
            state.peak_len = tracks.len();
            state.tracks = tracks;
        }
        playlist
    }

    pub fn with_uris(uris: &[String]) -> Self {
        Self::with_tracks(uris.iter().map(RemoteTrack::new).collect())
    }

    /// Splits reads into pages of the given size. Everything is one page by default.
    pub fn pages_of(self, size: usize) -> Self {
        self.state.lock().page_size = Some(size.max(1));
        self
    }

    /// The URIs currently in the playlist, in order.
    pub fn uris(&self) -> Vec<String> {
        self.state.lock().tracks.iter().map(|t| t.uri.clone()).collect()
    }

    /// The most tracks the playlist has held at once.
    pub fn peak_len(&self) -> usize {
        self.state.lock().peak_len
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Every call except reads.
    pub fn mutations(&self) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, Call::Read))
            .cloned()
            .collect()
    }

    pub fn fail_reads(&self, error: PlaylistError) {
        self.state.lock().read_error = Some(error);
    }

    pub fn fail_removals(&self, error: PlaylistError) {
        self.state.lock().remove_error = Some(error);
    }

    pub fn fail_appends(&self, error: PlaylistError) {
        self.state.lock().append_error = Some(error);
    }

    /// Makes reads never complete.
    pub fn hang_reads(&self) {
        self.state.lock().hang_reads = true;
    }

    /// Makes every page take this long to arrive, after its contents were taken.
    pub fn delay_reads(&self, delay: Duration) {
        self.state.lock().read_delay = Some(delay);
    }

    /// Clears every injected failure and delay.
    pub fn recover(&self) {
        let mut state = self.state.lock();

        state.hang_reads = false;
        state.read_delay = None;
        state.read_error = None;
        state.remove_error = None;
        state.append_error = None;
    }
}

#[async_trait]
impl PlaylistService for MemoryPlaylist {
    async fn playlist_page(
        &self,
        _playlist: &PlaylistId,
        offset: usize,
    ) -> Result<PlaylistPage, PlaylistError> {
        let (page, hang, delay) = {
            let mut state = self.state.lock();
            state.calls.push(Call::Read);

            if let Some(error) = state.read_error.clone() {
                return Err(error);
            }

            let len = state.tracks.len();
            let end = offset
                .saturating_add(state.page_size.unwrap_or(usize::MAX))
                .min(len);

            let tracks = state
                .tracks
                .get(offset..end)
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(|(i, track)| track.clone().at(offset + i))
                .collect();

            let page = PlaylistPage {
                snapshot_id: None,
                tracks,
                next: (end < len).then_some(end),
            };

            (page, state.hang_reads, state.read_delay)
        };

        if hang {
            std::future::pending::<()>().await;
        }

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(page)
    }

    async fn remove_track(
        &self,
        _playlist: &PlaylistId,
        removal: &Removal,
    ) -> Result<(), PlaylistError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Remove {
            uri: removal.uri.clone(),
            position: removal.position,
        });

        if let Some(error) = state.remove_error.clone() {
            return Err(error);
        }

        match state.tracks.get(removal.position) {
            Some(track) if track.uri == removal.uri => {
                state.tracks.remove(removal.position);
                Ok(())
            }
            _ => Err(PlaylistError::Status {
                status: 400,
                message: format!("{} is not at position {}", removal.uri, removal.position),
            }),
        }
    }

    async fn append_track(&self, _playlist: &PlaylistId, uri: &str) -> Result<(), PlaylistError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Append(uri.to_string()));

        if let Some(error) = state.append_error.clone() {
            return Err(error);
        }

        state.tracks.push(RemoteTrack {
            id: uri.rsplit(':').next().map(str::to_string),
            ..RemoteTrack::new(uri)
        });
        state.peak_len = state.peak_len.max(state.tracks.len());

        Ok(())
    }
}
