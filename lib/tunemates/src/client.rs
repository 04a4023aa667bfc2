use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::playlist::{AddPlaylistRequest, CreatedPlaylist, Playlist, PlaylistMetadata};
use shared::room::{CreatedRoom, Member, NewRoom, Room};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Result, TunematesError};
use crate::traits::RoomBackend;

/// HTTP client for the rooms API.
#[derive(Debug, Clone)]
pub struct RoomsClient {
    base_url: Url,
    client: Client,
}

#[derive(Default)]
pub struct RoomsClientBuilder {
    base_url: Option<String>,
    with_credentials: Option<bool>,
}

impl RoomsClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .base_url(&config.base_url)
            .with_credentials(config.with_credentials)
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    pub fn build(self) -> Result<RoomsClient> {
        let base_url_str = self.base_url.ok_or(TunematesError::NotConfigured)?;
        let base_url = Url::parse(base_url_str.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(TunematesError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let client = Client::builder()
            .cookie_store(self.with_credentials.unwrap_or(true))
            .build()?;

        Ok(RoomsClient { base_url, client })
    }
}

impl RoomsClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        RoomsClientBuilder::from_config(config).build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn make_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<B>,
    ) -> Result<T> {
        let url = self.endpoint(segments);
        debug!("Request: {} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(b) = body {
            request = request.json(&b);
        }
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(_) if !status.is_success() => "Could not read error body".to_string(),
            Err(e) => return Err(e.into()),
        };
        parse_body(status, &text)
    }
}

/// Maps a response status and body to the decoded payload or an error.
fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(TunematesError::Unauthenticated);
    }
    if !status.is_success() {
        return Err(TunematesError::Api {
            status: status.as_u16(),
            message: text.trim().to_string(),
        });
    }
    let body = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(body).map_err(|e| TunematesError::Api {
        status: status.as_u16(),
        message: format!("JSON parse error: {e}"),
    })
}

#[async_trait]
impl RoomBackend for RoomsClient {
    async fn current_user(&self) -> Result<Member> {
        self.make_request(Method::GET, &["user"], None::<()>).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rooms: Option<Vec<Room>> = self
            .make_request(Method::GET, &["rooms"], None::<()>)
            .await?;
        Ok(rooms.unwrap_or_default())
    }

    async fn create_room(&self, name: Option<&str>) -> Result<String> {
        let body = NewRoom {
            room_name: name.unwrap_or_default().trim().to_string(),
        };
        let created: CreatedRoom = self
            .make_request(Method::POST, &["rooms"], Some(&body))
            .await?;
        info!("Created room {}", created.room_id);
        Ok(created.room_id)
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        info!("Joining room {}", room_id);
        self.make_request::<serde_json::Value, ()>(
            Method::POST,
            &["rooms", room_id, "users"],
            None,
        )
        .await
        .map(|_| ())
    }

    async fn get_room(&self, room_id: &str) -> Result<Room> {
        self.make_request(Method::GET, &["rooms", room_id], None::<()>)
            .await
    }

    async fn start_job(&self, room_id: &str) -> Result<()> {
        info!("Starting common music search for room {}", room_id);
        // The backend answers with an empty body, any JSON it may add is ignored.
        self.make_request::<serde_json::Value, ()>(
            Method::POST,
            &["rooms", room_id, "playlists"],
            None,
        )
        .await
        .map(|_| ())
    }

    async fn list_playlists(&self, room_id: &str) -> Result<HashMap<String, PlaylistMetadata>> {
        let playlists: Option<HashMap<String, PlaylistMetadata>> = self
            .make_request(Method::GET, &["rooms", room_id, "playlists"], None::<()>)
            .await?;
        Ok(playlists.unwrap_or_default())
    }

    async fn get_playlist(&self, room_id: &str, playlist_id: &str) -> Result<Playlist> {
        self.make_request(
            Method::GET,
            &["rooms", room_id, "playlists", playlist_id],
            None::<()>,
        )
        .await
    }

    async fn create_playlist(
        &self,
        room_id: &str,
        playlist_id: &str,
        shared_counts: &[u32],
    ) -> Result<CreatedPlaylist> {
        info!(
            "Creating playlist {} for room {} with shared counts {:?}",
            playlist_id, room_id, shared_counts
        );
        let body = AddPlaylistRequest {
            shared_user_count: shared_counts.to_vec(),
        };
        self.make_request(
            Method::POST,
            &["rooms", room_id, "playlists", playlist_id, "add"],
            Some(&body),
        )
        .await
    }

    async fn health_check(&self) -> bool {
        match self
            .make_request::<serde_json::Value, ()>(Method::GET, &["health"], None)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("Rooms API health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RoomsClient {
        RoomsClientBuilder::new().base_url(base).build().unwrap()
    }

    #[test]
    fn builder_requires_base_url() {
        let result = RoomsClientBuilder::new().build();
        assert!(matches!(result, Err(TunematesError::NotConfigured)));
    }

    #[test]
    fn builder_rejects_invalid_url() {
        let result = RoomsClientBuilder::new().base_url("not a url").build();
        assert!(matches!(result, Err(TunematesError::Url(_))));
    }

    #[test]
    fn endpoint_joins_segments() {
        let client = client("http://localhost:8080/");
        assert_eq!(
            client.endpoint(&["rooms", "abc", "playlists"]).as_str(),
            "http://localhost:8080/rooms/abc/playlists"
        );
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let client = client("https://example.com/api");
        assert_eq!(
            client.endpoint(&["rooms", "abc"]).as_str(),
            "https://example.com/api/rooms/abc"
        );
    }

    #[test]
    fn endpoint_escapes_segments() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.endpoint(&["rooms", "a/b"]).as_str(),
            "http://localhost:8080/rooms/a%2Fb"
        );
    }

    #[test]
    fn endpoint_for_room_members() {
        let client = client("http://localhost:8080");
        assert_eq!(
            client.endpoint(&["rooms", "abc", "users"]).as_str(),
            "http://localhost:8080/rooms/abc/users"
        );
        assert_eq!(client.endpoint(&["user"]).as_str(), "http://localhost:8080/user");
    }

    #[test]
    fn join_accepts_empty_body() {
        let result: Result<serde_json::Value> = parse_body(StatusCode::OK, "");
        assert!(matches!(result, Ok(serde_json::Value::Null)));
    }

    #[test]
    fn locked_room_refusal_keeps_message() {
        let result: Result<serde_json::Value> = parse_body(
            StatusCode::BAD_REQUEST,
            "Room is locked and not accepting new members\n",
        );
        match result {
            Err(TunematesError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Room is locked"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn null_room_list_reads_as_none() {
        let result: Result<Option<Vec<Room>>> = parse_body(StatusCode::OK, "null");
        assert!(matches!(result, Ok(None)));
        let created: Result<CreatedRoom> = parse_body(StatusCode::OK, r#"{"room_id":"abc"}"#);
        assert_eq!(created.unwrap().room_id, "abc");
    }

    #[test]
    fn unauthorized_is_distinct() {
        let result: Result<Room> = parse_body(StatusCode::UNAUTHORIZED, "login required");
        assert!(matches!(result, Err(TunematesError::Unauthenticated)));
    }

    #[test]
    fn error_status_keeps_message() {
        let result: Result<Room> = parse_body(
            StatusCode::BAD_REQUEST,
            "Processing of music is already in progress\n",
        );
        match result {
            Err(TunematesError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Processing of music is already in progress");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let result: Result<Option<Room>> = parse_body(StatusCode::OK, "");
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn invalid_json_is_reported() {
        let result: Result<Room> = parse_body(StatusCode::OK, "{not json");
        match result {
            Err(TunematesError::Api { status, message }) => {
                assert_eq!(status, 200);
                assert!(message.starts_with("JSON parse error"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }
}
