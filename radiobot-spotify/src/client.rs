use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use radiobot_core::{
    PlaylistError, PlaylistId, PlaylistPage, PlaylistService, Removal, RemoteTrack,
};
use reqwest::{header::RETRY_AFTER, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use url::Url;

use crate::{SpotifyConfig, SpotifyError};

/// The most items the API returns in one page of a playlist
const PAGE_LIMIT: u32 = 100;

/// Only what the bridge needs from each playlist item
const ITEM_FIELDS: &str = "next,items(track(id,uri,name,type))";

/// The first page is read along with the snapshot id of the playlist
const PLAYLIST_FIELDS: &str = "snapshot_id,tracks.next,tracks.items(track(id,uri,name,type))";

/// A client for the playlist endpoints of the Spotify Web API.
pub struct SpotifyClient {
    http: Client,
    base: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Playlist {
    snapshot_id: Option<String>,
    tracks: Page,
}

#[derive(Debug, Deserialize)]
struct Page {
    items: Vec<Item>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Item {
    // Unavailable items are reported as null
    track: Option<ItemTrack>,
}

#[derive(Debug, Deserialize)]
struct ItemTrack {
    id: Option<String>,
    uri: String,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig) -> Result<Self, SpotifyError> {
        if config.api_base.cannot_be_a_base() {
            return Err(SpotifyError::InvalidBase(config.api_base.to_string()));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("radiobot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base: config.api_base.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Returns the url of a playlist.
    fn playlist_url(&self, playlist: &PlaylistId) -> Url {
        self.url(&["playlists", playlist.as_str()])
    }

    /// Returns the url of the items of a playlist.
    fn tracks_url(&self, playlist: &PlaylistId) -> Url {
        self.url(&["playlists", playlist.as_str(), "tracks"])
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();

        url.path_segments_mut()
            .expect("base was checked to be a base url")
            .pop_if_empty()
            .extend(segments);

        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlaylistError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, PlaylistError> {
        let response = self.send(self.http.get(url)).await?;

        response.json().await.map_err(map_transport_error)
    }
}

#[async_trait]
impl PlaylistService for SpotifyClient {
    async fn playlist_page(
        &self,
        playlist: &PlaylistId,
        offset: usize,
    ) -> Result<PlaylistPage, PlaylistError> {
        let (snapshot_id, page) = if offset == 0 {
            let mut url = self.playlist_url(playlist);
            url.query_pairs_mut().append_pair("fields", PLAYLIST_FIELDS);

            let object: Playlist = self.fetch(url).await?;
            (object.snapshot_id, object.tracks)
        } else {
            let mut url = self.tracks_url(playlist);
            url.query_pairs_mut()
                .append_pair("fields", ITEM_FIELDS)
                .append_pair("limit", &PAGE_LIMIT.to_string())
                .append_pair("offset", &offset.to_string());

            (None, self.fetch::<Page>(url).await?)
        };

        let count = page.items.len();
        debug!("Fetched {} playlist items at offset {}", count, offset);

        let tracks = page
            .items
            .into_iter()
            .enumerate()
            // Positions count every item, even those left out below
            .filter_map(|(i, item)| item.track.map(|track| (offset + i, track)))
            // Podcast episodes can be in playlists too
            .filter(|(_, track)| track.kind == "track")
            .map(|(position, track)| RemoteTrack {
                uri: track.uri,
                id: track.id,
                name: track.name,
                position,
            })
            .collect();

        Ok(PlaylistPage {
            snapshot_id,
            tracks,
            next: page.next.map(|_| offset + count),
        })
    }

    async fn remove_track(
        &self,
        playlist: &PlaylistId,
        removal: &Removal,
    ) -> Result<(), PlaylistError> {
        let mut body = json!({
            "tracks": [{ "uri": removal.uri, "positions": [removal.position] }]
        });

        if let Some(snapshot_id) = &removal.snapshot_id {
            body["snapshot_id"] = json!(snapshot_id);
        }

        let request = self.http.delete(self.tracks_url(playlist)).json(&body);

        self.send(request).await.map(|_| ())
    }

    async fn append_track(&self, playlist: &PlaylistId, uri: &str) -> Result<(), PlaylistError> {
        let body = json!({ "uris": [uri] });
        let request = self.http.post(self.tracks_url(playlist)).json(&body);

        self.send(request).await.map(|_| ())
    }
}

fn map_transport_error(error: reqwest::Error) -> PlaylistError {
    if error.is_timeout() {
        return PlaylistError::Timeout;
    }

    if error.is_decode() {
        return PlaylistError::Decode(error.to_string());
    }

    PlaylistError::Transport(error.to_string())
}

async fn handle_unsuccessful_request(response: Response, status: StatusCode) -> PlaylistError {
    match status {
        StatusCode::UNAUTHORIZED => return PlaylistError::Unauthorized,
        StatusCode::NOT_FOUND => return PlaylistError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs);

            return PlaylistError::RateLimited { retry_after };
        }
        _ => {}
    }

    let message = match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text),
        Err(e) => e.to_string(),
    };

    PlaylistError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server, ServerGuard};
    use radiobot_core::{fetch_snapshot, Provider};
    use serde_json::Value;

    use super::*;

    const PLAYLIST_PATH: &str = "/v1/playlists/p1";
    const TRACKS_PATH: &str = "/v1/playlists/p1/tracks";

    fn client(server: &ServerGuard) -> SpotifyClient {
        let mut config = SpotifyConfig::new("test-token");
        config.api_base = Url::parse(&format!("{}/v1", server.url())).unwrap();

        SpotifyClient::new(&config).unwrap()
    }

    fn item(id: &str, name: &str) -> Value {
        json!({
            "track": {
                "id": id,
                "uri": format!("spotify:track:{id}"),
                "name": name,
                "type": "track"
            }
        })
    }

    fn playlist() -> PlaylistId {
        PlaylistId::new("p1")
    }

    fn removal(uri: &str, position: usize, snapshot_id: Option<&str>) -> Removal {
        Removal {
            uri: uri.to_string(),
            position,
            snapshot_id: snapshot_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_reads_every_page_in_order() {
        let mut server = Server::new_async().await;
        let next = format!("{}{}?offset=2&limit=2", server.url(), TRACKS_PATH);

        let first_page = server
            .mock("GET", PLAYLIST_PATH)
            .match_query(Matcher::UrlEncoded(
                "fields".into(),
                PLAYLIST_FIELDS.into(),
            ))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "snapshot_id": "snap1",
                    "tracks": {
                        "items": [item("abc", "First"), item("def", "Second")],
                        "next": next
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let second_page = server
            .mock("GET", TRACKS_PATH)
            .match_query(Matcher::UrlEncoded("offset".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [item("ghi", "Third")],
                    "next": null
                })
                .to_string(),
            )
            .create_async()
            .await;

        let snapshot = fetch_snapshot(
            &client(&server),
            &playlist(),
            &Provider::spotify(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let uris: Vec<_> = snapshot.entries().iter().map(|e| e.track.uri()).collect();
        let positions: Vec<_> = snapshot.entries().iter().map(|e| e.position).collect();

        assert_eq!(
            uris,
            vec!["spotify:track:abc", "spotify:track:def", "spotify:track:ghi"]
        );
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(snapshot.entries()[2].label(), "Third");
        assert_eq!(snapshot.snapshot_id(), Some("snap1"));

        first_page.assert_async().await;
        second_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_skips_unavailable_items_and_episodes() {
        let mut server = Server::new_async().await;

        let _page = server
            .mock("GET", TRACKS_PATH)
            .match_query(Matcher::UrlEncoded("offset".into(), "100".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [
                        { "track": null },
                        { "track": { "id": "ep1", "uri": "spotify:episode:ep1", "name": "Pod", "type": "episode" } },
                        { "track": { "id": null, "uri": "spotify:local:Artist:Album:Title:180", "name": "Title", "type": "track" } },
                        item("abc", "Song"),
                    ],
                    "next": null
                })
                .to_string(),
            )
            .create_async()
            .await;

        let page = client(&server)
            .playlist_page(&playlist(), 100)
            .await
            .unwrap();

        let tracks: Vec<_> = page
            .tracks
            .iter()
            .map(|t| (t.uri.as_str(), t.position))
            .collect();

        assert_eq!(
            tracks,
            vec![
                ("spotify:local:Artist:Album:Title:180", 102),
                ("spotify:track:abc", 103)
            ]
        );
        assert_eq!(page.snapshot_id, None);
        assert_eq!(page.next, None);
    }

    #[tokio::test]
    async fn test_remove_track_at_position() {
        let mut server = Server::new_async().await;

        let remove = server
            .mock("DELETE", TRACKS_PATH)
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::Json(json!({
                "tracks": [{ "uri": "spotify:track:abc", "positions": [0] }],
                "snapshot_id": "snap1"
            })))
            .with_status(200)
            .with_body(r#"{"snapshot_id":"snap2"}"#)
            .create_async()
            .await;

        client(&server)
            .remove_track(&playlist(), &removal("spotify:track:abc", 0, Some("snap1")))
            .await
            .unwrap();

        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_track_without_snapshot_id() {
        let mut server = Server::new_async().await;

        let remove = server
            .mock("DELETE", TRACKS_PATH)
            .match_body(Matcher::Json(json!({
                "tracks": [{ "uri": "spotify:track:abc", "positions": [4] }]
            })))
            .with_status(200)
            .with_body(r#"{"snapshot_id":"snap2"}"#)
            .create_async()
            .await;

        client(&server)
            .remove_track(&playlist(), &removal("spotify:track:abc", 4, None))
            .await
            .unwrap();

        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_append_track() {
        let mut server = Server::new_async().await;

        let append = server
            .mock("POST", TRACKS_PATH)
            .match_body(Matcher::Json(json!({ "uris": ["spotify:track:ghi"] })))
            .with_status(201)
            .with_body(r#"{"snapshot_id":"snap"}"#)
            .create_async()
            .await;

        client(&server)
            .append_track(&playlist(), "spotify:track:ghi")
            .await
            .unwrap();

        append.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;

        let _unauthorized = server
            .mock("GET", PLAYLIST_PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":{"status":401,"message":"The access token expired"}}"#)
            .create_async()
            .await;

        let _rate_limited = server
            .mock("POST", TRACKS_PATH)
            .with_status(429)
            .with_header("retry-after", "3")
            .create_async()
            .await;

        let _missing = server
            .mock("DELETE", TRACKS_PATH)
            .with_status(404)
            .create_async()
            .await;

        let client = client(&server);

        assert_eq!(
            client.playlist_page(&playlist(), 0).await,
            Err(PlaylistError::Unauthorized)
        );
        assert_eq!(
            client.append_track(&playlist(), "spotify:track:abc").await,
            Err(PlaylistError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            })
        );
        assert_eq!(
            client
                .remove_track(&playlist(), &removal("spotify:track:abc", 0, None))
                .await,
            Err(PlaylistError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_error_message_is_extracted() {
        let mut server = Server::new_async().await;

        let _forbidden = server
            .mock("POST", TRACKS_PATH)
            .with_status(403)
            .with_body(r#"{"error":{"status":403,"message":"You cannot add tracks to a playlist you don't own."}}"#)
            .create_async()
            .await;

        let result = client(&server)
            .append_track(&playlist(), "spotify:track:abc")
            .await;

        assert_eq!(
            result,
            Err(PlaylistError::Status {
                status: 403,
                message: "You cannot add tracks to a playlist you don't own.".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_page() {
        let mut server = Server::new_async().await;

        let _page = server
            .mock("GET", PLAYLIST_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"snapshot_id": "snap1", "tracks": {"items": "nope"}}"#)
            .create_async()
            .await;

        let result = client(&server).playlist_page(&playlist(), 0).await;
        assert!(matches!(result, Err(PlaylistError::Decode(_))));
    }

    #[test]
    fn test_urls() {
        let mut config = SpotifyConfig::new("token");
        config.api_base = Url::parse("https://api.spotify.com/v1/").unwrap();

        let client = SpotifyClient::new(&config).unwrap();
        let playlist = PlaylistId::new("37i9dQZF1DXcBWIGoYBM5M");

        assert_eq!(
            client.playlist_url(&playlist).as_str(),
            "https://api.spotify.com/v1/playlists/37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            client.tracks_url(&playlist).as_str(),
            "https://api.spotify.com/v1/playlists/37i9dQZF1DXcBWIGoYBM5M/tracks"
        );
    }
}
