//! `RankStore` backed by the REST API over HTTP.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::db::models::{Link, Tag};

use super::protocol::{RankStore, StoreError};

#[derive(Serialize)]
struct LinkUpdateBody<'a> {
    title: &'a str,
    url: &'a str,
    icon_url: Option<&'a str>,
    order_index: i32,
    tags: Vec<i32>,
}

#[derive(Serialize)]
struct TagRankBody {
    order_index: i32,
}

#[derive(Serialize)]
struct TagReorderBody<'a> {
    #[serde(rename = "linkIds")]
    link_ids: &'a [i32],
}

pub struct HttpRankStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRankStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpRankStore {
            client: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, %body, "request rejected");
        if status == StatusCode::CONFLICT {
            Err(StoreError::Rejected(format!("conflict: {body}")))
        } else {
            Err(StoreError::Rejected(format!("{status}: {body}")))
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

#[async_trait]
impl RankStore for HttpRankStore {
    async fn fetch_links(&self) -> Result<Vec<Link>, StoreError> {
        let response = self
            .authed(self.client.get(self.url("/api/links")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn fetch_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let response = self
            .authed(self.client.get(self.url("/api/tags")))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_link(&self, link: &Link) -> Result<(), StoreError> {
        let body = LinkUpdateBody {
            title: &link.title,
            url: &link.url,
            icon_url: link.icon_url.as_deref(),
            order_index: link.order_index,
            tags: link.tags.iter().map(|t| t.id).collect(),
        };
        let response = self
            .authed(self.client.put(self.url(&format!("/api/links/{}", link.id))))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_tag_rank(&self, tag_id: i32, order_index: i32) -> Result<(), StoreError> {
        let response = self
            .authed(self.client.put(self.url(&format!("/api/tags/{tag_id}"))))
            .json(&TagRankBody { order_index })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn reorder_tag_links(&self, tag_id: i32, link_ids: &[i32]) -> Result<(), StoreError> {
        let response = self
            .authed(
                self.client
                    .put(self.url(&format!("/api/tags/{tag_id}/reorder"))),
            )
            .json(&TagReorderBody { link_ids })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_reorder_body_uses_camel_case_field() {
        let body = TagReorderBody { link_ids: &[3, 1, 2] };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "linkIds": [3, 1, 2] }));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let store = HttpRankStore::new("http://localhost:8080/");
        assert_eq!(store.url("/api/links"), "http://localhost:8080/api/links");
    }
}
