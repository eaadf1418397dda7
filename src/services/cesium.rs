//! Cesium+ pod client (Elasticsearch behind a thin REST facade).

use crate::domain::models::ProfileHit;
use crate::services::gva::is_pubkey;
use crate::services::transport::{decode, http_client, reported_error, send_json, BackendError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const SCROLL_WINDOW: &str = "2m";
const SCROLL_BATCH: u32 = 20_000;
const AVATAR_CONTENT: &str = "avatar._content";

/// One response of a scrolled search.
#[derive(Debug, Clone, Default)]
pub struct ScrollBatch {
    pub scroll_id: Option<String>,
    pub hits: Vec<ProfileHit>,
    /// Error text carried in an otherwise well-formed response.
    pub error: Option<String>,
}

/// Scrolled search over geolocated profiles.
pub trait ScrollSearch {
    fn open_scroll(&self) -> Result<ScrollBatch, BackendError>;
    fn next_batch(&self, scroll_id: &str) -> Result<ScrollBatch, BackendError>;
    fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Like {
    pub issuer: String,
    #[serde(default)]
    pub level: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StarsReport {
    pub likes: Vec<Like>,
    pub count: usize,
    /// Mean star level, 0 when nobody rated.
    pub score: f64,
}

impl StarsReport {
    pub fn from_likes(likes: Vec<Like>) -> Self {
        let rated: Vec<f64> = likes.iter().filter_map(|l| l.level).map(f64::from).collect();
        let score = if rated.is_empty() {
            0.0
        } else {
            rated.iter().sum::<f64>() / rated.len() as f64
        };
        Self {
            count: likes.len(),
            likes,
            score,
        }
    }
}

pub struct PodClient {
    http: Client,
    base: String,
}

impl PodClient {
    pub fn new(pod: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        Ok(Self {
            http: http_client(timeout_secs)?,
            base: pod.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn get_document(&self, path: &str, with_avatar: bool) -> Result<Option<Value>, BackendError> {
        let url = self.url(path);
        let mut req = self.http.get(&url);
        if !with_avatar {
            req = req.query(&[("_source_exclude", AVATAR_CONTENT)]);
        }
        let (status, body) = send_json(req, &url)?;
        if let Some(err) = reported_error(&body) {
            return Err(BackendError::Reported(err));
        }
        if status == 404 || body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        Ok(Some(document(body)))
    }

    fn search(&self, path: &str, query: &Value) -> Result<Value, BackendError> {
        let url = self.url(path);
        let (status, body) = send_json(self.http.post(&url).json(query), &url)?;
        if let Some(err) = reported_error(&body) {
            return Err(BackendError::Reported(err));
        }
        if !(200..300).contains(&status) {
            return Err(BackendError::Status { url, status });
        }
        Ok(body)
    }

    /// Profile by pubkey, or by title when `who` is not a pubkey.
    pub fn profile(&self, who: &str, with_avatar: bool) -> Result<Option<Value>, BackendError> {
        if is_pubkey(who) {
            let pubkey = who.split(':').next().unwrap_or(who);
            return self.get_document(&format!("user/profile/{}", pubkey), with_avatar);
        }
        let mut query = json!({
            "query": { "match": { "title": who } },
            "size": 1,
        });
        if !with_avatar {
            query["_source"] = json!({ "excludes": [AVATAR_CONTENT] });
        }
        let body = self.search("user/profile/_search", &query)?;
        Ok(body
            .pointer("/hits/hits/0")
            .cloned()
            .map(document))
    }

    pub fn page(&self, id: &str, with_avatar: bool) -> Result<Option<Value>, BackendError> {
        self.get_document(&format!("page/record/{}", id), with_avatar)
    }

    pub fn offer(&self, id: &str) -> Result<Option<Value>, BackendError> {
        self.get_document(&format!("market/record/{}", id), true)
    }

    /// Stars given to the profile of `pubkey`.
    pub fn stars(&self, pubkey: &str) -> Result<StarsReport, BackendError> {
        let query = json!({
            "query": { "bool": { "filter": [
                { "term": { "index": "user" } },
                { "term": { "type": "profile" } },
                { "term": { "id": pubkey } },
                { "term": { "kind": "STAR" } },
            ] } },
            "size": 5000,
            "_source": ["issuer", "level"],
        });
        let url = self.url("like/record/_search");
        let body = self.search("like/record/_search", &query)?;
        let sources: Vec<Value> = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| hits.iter().filter_map(|h| h.get("_source").cloned()).collect())
            .unwrap_or_default();
        let likes: Vec<Like> = decode(Value::Array(sources), &url)?;
        Ok(StarsReport::from_likes(likes))
    }

    fn scroll_batch(&self, url: &str, body: Value) -> Result<ScrollBatch, BackendError> {
        let error = reported_error(&body);
        let scroll_id = body
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let hits = match body.pointer("/hits/hits") {
            Some(hits) => decode(hits.clone(), url)?,
            None => Vec::new(),
        };
        Ok(ScrollBatch {
            scroll_id,
            hits,
            error,
        })
    }
}

impl ScrollSearch for PodClient {
    fn open_scroll(&self) -> Result<ScrollBatch, BackendError> {
        let url = self.url("user/profile/_search");
        let query = json!({
            "query": { "constant_score": { "filter": [
                { "exists": { "field": "geoPoint" } },
                { "geo_bounding_box": { "geoPoint": {
                    "top_left": { "lat": 90, "lon": -180 },
                    "bottom_right": { "lat": -90, "lon": 180 },
                } } },
            ] } },
            "_source": [
                "title",
                "avatar._content_type",
                "description",
                "city",
                "address",
                "socials.url",
                "creationTime",
                "membersCount",
                "type",
                "geoPoint",
            ],
            "size": SCROLL_BATCH,
        });
        let req = self
            .http
            .post(&url)
            .query(&[("scroll", SCROLL_WINDOW)])
            .json(&query);
        let (_, body) = send_json(req, &url)?;
        self.scroll_batch(&url, body)
    }

    fn next_batch(&self, scroll_id: &str) -> Result<ScrollBatch, BackendError> {
        let url = self.url("_search/scroll");
        let req = self
            .http
            .post(&url)
            .json(&json!({ "scroll_id": scroll_id, "scroll": SCROLL_WINDOW }));
        let (_, body) = send_json(req, &url)?;
        self.scroll_batch(&url, body)
    }

    fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
        let url = self.url("_search/scroll");
        let req = self
            .http
            .delete(&url)
            .json(&json!({ "scroll_id": [scroll_id] }));
        let (status, body) = send_json(req, &url)?;
        if let Some(err) = reported_error(&body) {
            return Err(BackendError::Reported(err));
        }
        if !(200..300).contains(&status) {
            return Err(BackendError::Status { url, status });
        }
        Ok(())
    }
}

/// Flattens an Elasticsearch document into its source plus `pubkey`/`id`.
fn document(hit: Value) -> Value {
    let id = hit.get("_id").cloned();
    let index = hit.get("_index").and_then(Value::as_str).map(str::to_string);
    let mut out = match hit.get("_source") {
        Some(Value::Object(src)) => src.clone(),
        _ => Map::new(),
    };
    if let Some(id) = id {
        let key = if index.as_deref() == Some("user") { "pubkey" } else { "id" };
        out.insert(key.to_string(), id);
    }
    Value::Object(out)
}
