//! Geolocated profiles joined with the wallet registry.

use crate::domain::models::{AggregatedProfile, GeolocReport, ProfileHit, Wallet};
use crate::services::cesium::ScrollSearch;
use crate::services::gva::WalletRegistry;
use crate::services::transport::BackendError;
use crate::services::wallets::WalletAggregator;
use serde_json::Value;
use std::collections::BTreeMap;

/// Holds an open scroll and releases it, with the latest id, when dropped.
pub struct ScrollContext<'a, S: ScrollSearch + ?Sized> {
    search: &'a S,
    scroll_id: Option<String>,
}

impl<'a, S: ScrollSearch + ?Sized> ScrollContext<'a, S> {
    pub fn new(search: &'a S, scroll_id: Option<String>) -> Self {
        Self { search, scroll_id }
    }

    pub fn id(&self) -> Option<&str> {
        self.scroll_id.as_deref()
    }

    /// Backends may hand out a new id with each batch; keep the newest.
    pub fn advance(&mut self, next: Option<String>) {
        if next.is_some() {
            self.scroll_id = next;
        }
    }
}

impl<S: ScrollSearch + ?Sized> Drop for ScrollContext<'_, S> {
    fn drop(&mut self) {
        let Some(id) = self.scroll_id.take() else {
            return;
        };
        match self.search.clear_scroll(&id) {
            Ok(()) => tracing::debug!("scroll context released"),
            Err(e) => tracing::warn!(error = %e, "could not release scroll context"),
        }
    }
}

/// Drains the scrolled profile search. The scroll is released on every path.
pub fn scroll_profiles<S: ScrollSearch + ?Sized>(
    search: &S,
) -> Result<Vec<ProfileHit>, BackendError> {
    let first = search.open_scroll()?;
    let mut ctx = ScrollContext::new(search, first.scroll_id);
    if let Some(err) = first.error {
        return Err(BackendError::Reported(err));
    }
    let mut hits = first.hits;
    let mut fetches = 1usize;
    while let Some(id) = ctx.id().map(str::to_string) {
        let batch = search.next_batch(&id)?;
        fetches += 1;
        ctx.advance(batch.scroll_id);
        if let Some(err) = batch.error {
            return Err(BackendError::Reported(err));
        }
        if batch.hits.is_empty() {
            break;
        }
        hits.extend(batch.hits);
    }
    tracing::debug!(fetches, hits = hits.len(), "profile scroll drained");
    Ok(hits)
}

fn non_empty_text(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

fn non_empty_value(v: Option<Value>) -> Option<Value> {
    v.filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    })
}

/// Inner join on pubkey; hits without a wallet or a usable geoPoint are dropped.
pub fn join(
    hits: Vec<ProfileHit>,
    wallets: &BTreeMap<String, Wallet>,
    time: u64,
) -> GeolocReport {
    let total = hits.len();
    let profiles: Vec<AggregatedProfile> = hits
        .into_iter()
        .filter_map(|hit| {
            let wallet = wallets.get(&hit.id)?;
            let src = hit.source;
            Some(AggregatedProfile {
                geo_point: src.geo_point?,
                pubkey: hit.id,
                address: non_empty_text(src.address),
                city: non_empty_text(src.city),
                description: non_empty_text(src.description),
                avatar: non_empty_value(src.avatar),
                user_id: wallet.username().map(str::to_string).filter(|u| !u.is_empty()),
                is_member: wallet.is_member(),
                socials: non_empty_value(src.socials),
                title: non_empty_text(src.title),
            })
        })
        .collect();
    tracing::debug!(candidates = total, joined = profiles.len(), "profiles joined");
    GeolocReport {
        wallets: profiles,
        time,
    }
}

pub struct ProfileGeolocator<'a, S: ScrollSearch + ?Sized, R: WalletRegistry + ?Sized> {
    search: &'a S,
    wallets: WalletAggregator<'a, R>,
}

impl<'a, S: ScrollSearch + ?Sized, R: WalletRegistry + ?Sized> ProfileGeolocator<'a, S, R> {
    pub fn new(search: &'a S, wallets: WalletAggregator<'a, R>) -> Self {
        Self { search, wallets }
    }

    pub fn locate(&self) -> Result<GeolocReport, BackendError> {
        let hits = scroll_profiles(self.search)?;
        let map = self.wallets.wallet_map()?;
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        Ok(join(hits, &map, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::cesium::ScrollBatch;
    use crate::services::wallets::tests::{node, FakeRegistry};
    use serde_json::json;
    use std::cell::RefCell;

    fn hit(id: &str, source: Value) -> ProfileHit {
        serde_json::from_value(json!({"_id": id, "_source": source})).expect("hit")
    }

    fn located(id: &str) -> ProfileHit {
        hit(id, json!({"geoPoint": {"lat": 48.85, "lon": 2.35}}))
    }

    enum Step {
        Batch(Vec<ProfileHit>, &'static str),
        Payload(&'static str),
        Fail,
    }

    struct FakeScroll {
        open: Vec<ProfileHit>,
        steps: RefCell<Vec<Step>>,
        fetches: RefCell<usize>,
        released: RefCell<Vec<String>>,
    }

    impl FakeScroll {
        fn new(open: Vec<ProfileHit>, steps: Vec<Step>) -> Self {
            Self {
                open,
                steps: RefCell::new(steps),
                fetches: RefCell::new(0),
                released: RefCell::new(Vec::new()),
            }
        }
    }

    impl ScrollSearch for FakeScroll {
        fn open_scroll(&self) -> Result<ScrollBatch, BackendError> {
            *self.fetches.borrow_mut() += 1;
            Ok(ScrollBatch {
                scroll_id: Some("s0".into()),
                hits: self.open.clone(),
                error: None,
            })
        }

        fn next_batch(&self, _scroll_id: &str) -> Result<ScrollBatch, BackendError> {
            *self.fetches.borrow_mut() += 1;
            let mut steps = self.steps.borrow_mut();
            let step = if steps.is_empty() {
                Step::Batch(vec![], "end")
            } else {
                steps.remove(0)
            };
            match step {
                Step::Batch(hits, id) => Ok(ScrollBatch {
                    scroll_id: Some(id.into()),
                    hits,
                    error: None,
                }),
                Step::Payload(reason) => Ok(ScrollBatch {
                    scroll_id: None,
                    hits: vec![],
                    error: Some(reason.into()),
                }),
                Step::Fail => Err(BackendError::Reported("connection reset".into())),
            }
        }

        fn clear_scroll(&self, scroll_id: &str) -> Result<(), BackendError> {
            self.released.borrow_mut().push(scroll_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn three_fetches_one_release() {
        let scroll = FakeScroll::new(
            vec![located("A"), located("B")],
            vec![Step::Batch(vec![located("C")], "s1"), Step::Batch(vec![], "s2")],
        );
        let hits = scroll_profiles(&scroll).expect("hits");
        assert_eq!(hits.len(), 3);
        assert_eq!(*scroll.fetches.borrow(), 3);
        assert_eq!(*scroll.released.borrow(), vec!["s2".to_string()]);
    }

    #[test]
    fn error_payload_is_surfaced_after_release() {
        let scroll = FakeScroll::new(
            vec![located("A")],
            vec![Step::Payload("No search context found")],
        );
        let err = scroll_profiles(&scroll).expect_err("error payload");
        assert_eq!(err.to_string(), "No search context found");
        assert_eq!(*scroll.released.borrow(), vec!["s0".to_string()]);
    }

    #[test]
    fn transport_failure_still_releases_the_scroll() {
        let scroll = FakeScroll::new(
            vec![located("A")],
            vec![Step::Batch(vec![located("B")], "s1"), Step::Fail],
        );
        assert!(scroll_profiles(&scroll).is_err());
        assert_eq!(*scroll.released.borrow(), vec!["s1".to_string()]);
    }

    #[test]
    fn join_is_inner_on_pubkey() {
        let reg = FakeRegistry::single(vec![node("A", 100, Some((true, "alice")))]);
        let scroll = FakeScroll::new(vec![located("A"), located("C")], vec![]);
        let geo = ProfileGeolocator::new(&scroll, WalletAggregator::new(&reg, 0));
        let report = geo.locate().expect("report");
        assert_eq!(report.wallets.len(), 1);
        let a = &report.wallets[0];
        assert_eq!(a.pubkey, "A");
        assert!(a.is_member);
        assert_eq!(a.user_id.as_deref(), Some("alice"));
        assert!(report.time > 1_600_000_000);
        assert_eq!(scroll.released.borrow().len(), 1);
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let mut wallets = BTreeMap::new();
        let w: Wallet = node("A", 1, None).into();
        wallets.insert("A".to_string(), w);
        let hits = vec![
            hit(
                "A",
                json!({
                    "title": "Chez Alice",
                    "city": "",
                    "description": null,
                    "avatar": {"_content_type": "image/png"},
                    "socials": [],
                    "geoPoint": {"lat": 1.5, "lon": -3}
                }),
            ),
            hit("A", json!({"title": "no point"})),
        ];
        let report = join(hits, &wallets, 42);
        assert_eq!(report.wallets.len(), 1);
        let v = serde_json::to_value(&report).expect("json");
        assert_eq!(v["time"], 42);
        let p = v["wallets"][0].as_object().expect("object");
        let mut keys: Vec<&str> = p.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["avatar", "geoPoint", "isMember", "pubkey", "title"]);
        assert_eq!(p["isMember"], false);
        assert_eq!(p["geoPoint"]["lon"], -3.0);
    }
}
