// HTTP implementations of the backend and renewer seams.
//
// A blocking reqwest client; the sans-IO state machines call straight into
// it from the driver thread. Must not be used from inside a tokio runtime.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use festa_common::protocol::chat::ChatMessage;
use festa_common::types::{JoinOutcome, RoomDetail, TokenGrant, UnreadCount};

use crate::backend::ChatBackend;
use crate::session::TokenRenewer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking REST client for the festa backend.
pub struct HttpChatBackend {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct MembershipRequest<'a> {
    username: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadStatusRequest<'a> {
    room_id: &'a str,
    username: &'a str,
    last_read_seq: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReissueBody {
    expires_in: u64,
}

impl HttpChatBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, access_token: None })
    }

    /// Install the bearer token used for subsequent requests.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .authorize(self.http.get(url))
            .send()
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;
        response.json::<T>().with_context(|| format!("GET {url}: malformed response body"))
    }
}

impl ChatBackend for HttpChatBackend {
    fn join_room(&mut self, room_id: &str, username: &str) -> Result<JoinOutcome> {
        let url = self.url(&format!("/chat/rooms/{room_id}/join"));
        let response = self
            .authorize(self.http.post(&url))
            .json(&MembershipRequest { username })
            .send()
            .with_context(|| format!("POST {url} failed"))?;

        // Rejections arrive as a 4xx carrying the outcome body; both block
        // room entry, but only the body has the user-visible reason.
        let status = response.status();
        if status.is_success() || status.is_client_error() {
            response.json::<JoinOutcome>().with_context(|| format!("POST {url}: malformed join outcome"))
        } else {
            bail!("POST {url}: unexpected status {status}")
        }
    }

    fn room_detail(&mut self, room_id: &str) -> Result<RoomDetail> {
        self.get_json(&self.url(&format!("/chat/rooms/{room_id}")))
    }

    fn recent_messages(&mut self, room_id: &str, size: u32) -> Result<Vec<ChatMessage>> {
        let url = self.url(&format!("/chat/rooms/{room_id}/messages"));
        let response = self
            .authorize(self.http.get(&url))
            .query(&[("size", size)])
            .send()
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;
        response.json().with_context(|| format!("GET {url}: malformed history page"))
    }

    fn update_read_status(
        &mut self,
        room_id: &str,
        username: &str,
        last_read_seq: i64,
    ) -> Result<()> {
        let url = self.url("/chat/rooms/update-status");
        self.authorize(self.http.post(&url))
            .json(&ReadStatusRequest { room_id, username, last_read_seq })
            .send()
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} returned an error status"))?;
        debug!(room_id, last_read_seq, "read receipt persisted");
        Ok(())
    }

    fn total_unread_count(&mut self, username: &str) -> Result<UnreadCount> {
        self.get_json(&self.url(&format!("/chat/users/{username}/unread-count")))
    }

    fn leave_room(&mut self, room_id: &str, username: &str) -> Result<()> {
        let url = self.url(&format!("/chat/rooms/{room_id}/leave"));
        self.authorize(self.http.post(&url))
            .json(&MembershipRequest { username })
            .send()
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} returned an error status"))?;
        Ok(())
    }

    fn delete_room(&mut self, room_id: &str) -> Result<()> {
        let url = self.url(&format!("/chat/rooms/{room_id}"));
        self.authorize(self.http.delete(&url))
            .send()
            .with_context(|| format!("DELETE {url} failed"))?
            .error_for_status()
            .with_context(|| format!("DELETE {url} returned an error status"))?;
        Ok(())
    }
}

impl TokenRenewer for HttpChatBackend {
    /// `POST /reissue`: the rotated access token arrives in the
    /// `Authorization` response header, its lifetime in the body.
    fn renew(&mut self) -> Result<TokenGrant> {
        let url = self.url("/reissue");
        let response = self
            .authorize(self.http.post(&url))
            .send()
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} was rejected"))?;

        let access_token = {
            let header = response
                .headers()
                .get(AUTHORIZATION)
                .ok_or_else(|| anyhow!("POST {url}: response carries no Authorization header"))?
                .to_str()
                .context("reissued token is not valid header text")?;
            header.strip_prefix("Bearer ").unwrap_or(header).to_string()
        };

        let body: ReissueBody =
            response.json().with_context(|| format!("POST {url}: malformed response body"))?;

        // Keep this client's own bearer current as well.
        self.access_token = Some(access_token.clone());
        Ok(TokenGrant { access_token, expires_in_seconds: body.expires_in })
    }
}
