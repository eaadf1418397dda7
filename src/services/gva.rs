//! Duniter GVA GraphQL client.

use crate::domain::models::{
    Balance, Direction, HistoryEntry, Identity, PageInfo, WalletNode, WalletPage,
};
use crate::services::transport::{decode, http_client, send_json, BackendError};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Source of wallet registry pages.
pub trait WalletRegistry {
    fn wallet_page(&self, cursor: Option<&str>, page_size: u32)
        -> Result<WalletPage, BackendError>;
}

pub struct GvaClient {
    http: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletsConnection {
    #[serde(default)]
    page_info: PageInfo,
    edges: Vec<WalletEdge>,
}

#[derive(Deserialize)]
struct WalletEdge {
    node: WalletNode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxNode {
    #[serde(default)]
    issuers: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    comment: String,
    written_time: Option<i64>,
}

#[derive(Deserialize)]
struct TxEdge {
    direction: String,
    node: TxNode,
}

impl GvaClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        Ok(Self {
            http: http_client(timeout_secs)?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs one GraphQL document and returns its `data` member.
    pub fn query(&self, document: &str) -> Result<Value, BackendError> {
        tracing::debug!(endpoint = %self.endpoint, "gva query");
        let req = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": document }));
        let (status, body) = send_json(req, &self.endpoint)?;
        let parsed: GraphqlResponse = decode(body, &self.endpoint)?;
        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(BackendError::Reported(messages.join("\n")));
        }
        match parsed.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(BackendError::Status {
                url: self.endpoint.clone(),
                status,
            }),
        }
    }

    pub fn balance(&self, pubkey: &str) -> Result<Option<Balance>, BackendError> {
        let data = self.query(&format!(
            "{{ balance(script: \"{}\") {{ amount base }} }}",
            pubkey
        ))?;
        Ok(data
            .get("balance")
            .and_then(|b| b.get("amount"))
            .and_then(Value::as_i64)
            .map(Balance))
    }

    pub fn current_ud(&self) -> Result<Balance, BackendError> {
        let data = self.query("{ currentUd { amount base } }")?;
        data.get("currentUd")
            .and_then(|u| u.get("amount"))
            .and_then(Value::as_i64)
            .map(Balance)
            .ok_or_else(|| BackendError::Decode {
                url: self.endpoint.clone(),
                message: "missing currentUd.amount".to_string(),
            })
    }

    pub fn identity(&self, pubkey: &str) -> Result<Option<Identity>, BackendError> {
        let data = self.query(&format!(
            "{{ idty(pubkey: \"{}\") {{ isMember username }} }}",
            pubkey
        ))?;
        match data.get("idty") {
            None | Some(Value::Null) => Ok(None),
            Some(v) => decode(v.clone(), &self.endpoint).map(Some),
        }
    }

    /// Most recent blockchain transactions first.
    pub fn history(
        &self,
        pubkey: &str,
        count: i64,
    ) -> Result<Vec<HistoryEntry>, BackendError> {
        let data = self.query(&format!(
            "{{ txsHistoryBc(script: \"{}\", pagination: {{ pageSize: {}, ord: DESC }}) {{ \
             both {{ edges {{ direction node {{ issuers outputs comment writtenTime }} }} }} }} }}",
            pubkey,
            count.max(1)
        ))?;
        let edges = data
            .pointer("/txsHistoryBc/both/edges")
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        let edges: Vec<TxEdge> = decode(edges, &self.endpoint)?;
        Ok(edges
            .into_iter()
            .filter_map(|e| history_entry(pubkey, e))
            .collect())
    }
}

impl WalletRegistry for GvaClient {
    fn wallet_page(
        &self,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<WalletPage, BackendError> {
        let cursor = match cursor {
            Some(c) => serde_json::to_string(c).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        };
        let data = self.query(&format!(
            "{{ wallets(pagination: {{ cursor: {}, ord: ASC, pageSize: {} }}) {{ \
             pageInfo {{ hasNextPage endCursor }} \
             edges {{ node {{ script balance {{ amount base }} \
             idty {{ isMember username }} }} }} }} }}",
            cursor, page_size
        ))?;
        let conn = data.get("wallets").cloned().unwrap_or(Value::Null);
        let conn: WalletsConnection = decode(conn, &self.endpoint)?;
        Ok(WalletPage {
            nodes: conn.edges.into_iter().map(|e| e.node).collect(),
            page_info: conn.page_info,
        })
    }
}

/// Accepts base58 pubkeys, with or without a `:checksum` suffix.
pub fn is_pubkey(candidate: &str) -> bool {
    let key = candidate.split(':').next().unwrap_or_default();
    (40..=45).contains(&key.len())
        && bs58::decode(key)
            .into_vec()
            .map(|b| (31..=32).contains(&b.len()))
            .unwrap_or(false)
}

/// `AMOUNT:BASE:SIG(PUBKEY)` → (centimes, recipient).
fn parse_output(raw: &str) -> Option<(i64, String)> {
    let mut parts = raw.splitn(3, ':');
    let amount: i64 = parts.next()?.parse().ok()?;
    let base: u32 = parts.next()?.parse().ok()?;
    let condition = parts.next()?;
    let recipient = condition
        .strip_prefix("SIG(")
        .and_then(|c| c.strip_suffix(')'))
        .unwrap_or(condition);
    Some((amount.checked_mul(10i64.checked_pow(base)?)?, recipient.to_string()))
}

fn history_entry(owner: &str, edge: TxEdge) -> Option<HistoryEntry> {
    let outputs: Vec<(i64, String)> = edge
        .node
        .outputs
        .iter()
        .filter_map(|o| parse_output(o))
        .collect();
    let (direction, amount, counterparty) = match edge.direction.as_str() {
        "RECEIVED" => (
            Direction::Received,
            outputs.iter().filter(|(_, to)| to == owner).map(|(a, _)| a).sum(),
            edge.node.issuers.first().cloned().unwrap_or_default(),
        ),
        "SENT" => {
            let away: Vec<&(i64, String)> = outputs.iter().filter(|(_, to)| to != owner).collect();
            (
                Direction::Sent,
                away.iter().map(|(a, _)| a).sum(),
                away.first().map(|(_, to)| to.clone()).unwrap_or_default(),
            )
        }
        other => {
            tracing::debug!(direction = other, "skipping transaction with unknown direction");
            return None;
        }
    };
    let date = edge
        .node
        .written_time
        .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
        .map(|d| d.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|| "pending".to_string());
    Some(HistoryEntry {
        date,
        direction,
        pubkey: counterparty,
        amount: Balance(amount),
        comment: edge.node.comment,
    })
}
