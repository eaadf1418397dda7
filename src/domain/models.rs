use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Ğ1 amount held as the ledger's integer centimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct Balance(pub i64);

impl Balance {
    pub fn units(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.units())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub is_member: bool,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountNode {
    pub amount: i64,
}

/// One `wallets.edges[].node` of the GVA registry query.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletNode {
    pub script: String,
    pub balance: AmountNode,
    pub idty: Option<Identity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WalletPage {
    pub nodes: Vec<WalletNode>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
    pub pubkey: String,
    pub balance: Balance,
    pub id: Option<Identity>,
}

impl Wallet {
    pub fn is_member(&self) -> bool {
        self.id.as_ref().map(|i| i.is_member).unwrap_or(false)
    }

    pub fn username(&self) -> Option<&str> {
        self.id.as_ref().and_then(|i| i.username.as_deref())
    }
}

impl From<WalletNode> for Wallet {
    fn from(node: WalletNode) -> Self {
        Self {
            pubkey: node.script,
            balance: Balance(node.balance.amount),
            id: node.idty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSource {
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<Value>,
    pub socials: Option<Value>,
    #[serde(rename = "geoPoint", default, deserialize_with = "lenient_geo_point")]
    pub geo_point: Option<GeoPoint>,
}

// Older Cesium+ documents store coordinates as strings.
fn lenient_geo_point<'de, D: Deserializer<'de>>(d: D) -> Result<Option<GeoPoint>, D::Error> {
    let raw = Option::<Value>::deserialize(d)?;
    let coord = |v: Option<&Value>| match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(raw.and_then(|v| {
        Some(GeoPoint {
            lat: coord(v.get("lat"))?,
            lon: coord(v.get("lon"))?,
        })
    }))
}

/// A profile search hit; `_id` is the account pubkey.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: ProfileSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedProfile {
    pub pubkey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub is_member: bool,
    pub geo_point: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socials: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeolocReport {
    pub wallets: Vec<AggregatedProfile>,
    pub time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Received,
    Sent,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub date: String,
    pub direction: Direction,
    pub pubkey: String,
    pub amount: Balance,
    pub comment: String,
}
