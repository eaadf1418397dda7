//! Wallet registry aggregation: fetch, filter, render.

use crate::domain::models::Wallet;
use crate::services::gva::WalletRegistry;
use crate::services::transport::BackendError;
use std::collections::BTreeMap;

/// Independent toggles; checked in field order, first match excludes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletFilter {
    pub mbr: bool,
    pub non_mbr: bool,
    pub larf: bool,
}

impl WalletFilter {
    pub fn keeps(&self, wallet: &Wallet) -> bool {
        if self.mbr && !wallet.is_member() {
            return false;
        }
        if self.non_mbr && wallet.is_member() {
            return false;
        }
        if self.larf && wallet.id.is_none() {
            return false;
        }
        true
    }

    fn labels_usernames(&self) -> bool {
        self.mbr || self.non_mbr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// One pubkey per line.
    Plain,
    JsonList,
}

pub struct WalletAggregator<'a, R: WalletRegistry + ?Sized> {
    registry: &'a R,
    page_size: u32,
}

impl<'a, R: WalletRegistry + ?Sized> WalletAggregator<'a, R> {
    pub fn new(registry: &'a R, page_size: u32) -> Self {
        Self {
            registry,
            page_size,
        }
    }

    /// Every wallet of the registry, in backend order.
    pub fn collect(&self) -> Result<Vec<Wallet>, BackendError> {
        let mut wallets = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = self.registry.wallet_page(cursor.as_deref(), self.page_size)?;
            pages += 1;
            wallets.extend(page.nodes.into_iter().map(Wallet::from));
            let next = match (page.page_info.has_next_page, page.page_info.end_cursor) {
                (true, Some(next)) if cursor.as_deref() != Some(next.as_str()) => next,
                _ => break,
            };
            cursor = Some(next);
        }
        tracing::debug!(pages, wallets = wallets.len(), "wallet registry fetched");
        Ok(wallets)
    }

    pub fn list(&self, filter: WalletFilter) -> Result<Vec<Wallet>, BackendError> {
        let mut wallets = self.collect()?;
        wallets.retain(|w| filter.keeps(w));
        Ok(wallets)
    }

    /// Unfiltered lookup table keyed by pubkey, used by the profile join.
    pub fn wallet_map(&self) -> Result<BTreeMap<String, Wallet>, BackendError> {
        Ok(self
            .collect()?
            .into_iter()
            .map(|w| (w.pubkey.clone(), w))
            .collect())
    }
}

pub fn render(
    wallets: &[Wallet],
    filter: WalletFilter,
    shape: OutputShape,
) -> serde_json::Result<String> {
    match shape {
        OutputShape::Plain => Ok(wallets
            .iter()
            .map(|w| match w.username() {
                Some(name) if filter.labels_usernames() => format!("{} {}", w.pubkey, name),
                _ => w.pubkey.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")),
        OutputShape::JsonList => serde_json::to_string_pretty(wallets),
    }
}
