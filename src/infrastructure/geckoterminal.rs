//! GeckoTerminal client: the secondary, DEX-side quote source.
//!
//! Serves the token-graph tools (pools, liquidity, per-DEX prices) and
//! acts as the fallback for price snapshots when the primary cannot
//! resolve a symbol. Payloads follow the JSON:API envelope.

use crate::domain::candle::Candle;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::snapshot::PriceSnapshot;
use crate::infrastructure::core::http::{build_http_client, url_with_query};
use chrono::Utc;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";

/// A liquidity pool as listed by the upstream.
#[derive(Debug, Clone)]
pub struct Pool {
    pub id: String,
    pub address: String,
    pub name: String,
    pub network: String,
    pub dex: String,
    pub base_token_price_usd: Option<f64>,
    pub reserve_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub price_change_24h_pct: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub price_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub total_reserve_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DexInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
}

pub struct GeckoTerminalClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> AnalysisResult<T> {
        debug!(url, "geckoterminal request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(match code {
                404 => AnalysisError::InvalidSymbol(body),
                429 => AnalysisError::RateLimit(body),
                _ => AnalysisError::Network(format!("HTTP {}: {}", code, body)),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::DataParsing(format!("geckoterminal payload: {}", e)))
    }

    /// Global pool search, optionally pinned to one network.
    pub async fn search_pools(
        &self,
        query: &str,
        network: Option<&str>,
        limit: usize,
    ) -> AnalysisResult<Vec<Pool>> {
        let mut params = vec![("query", query.to_string())];
        if let Some(n) = network {
            params.push(("network", n.to_string()));
        }
        let url = url_with_query(&format!("{}/search/pools", self.base_url), &params);

        let doc: Document<Vec<PoolResource>> = self.get_json(&url).await?;
        Ok(doc.data.into_iter().take(limit).map(PoolResource::into_pool).collect())
    }

    /// Top pools of a network. `sort` is passed through upstream
    /// (`h24_volume_usd_desc` or `h24_tx_count_desc`).
    pub async fn network_pools(
        &self,
        network: &str,
        sort: Option<&str>,
        limit: usize,
    ) -> AnalysisResult<Vec<Pool>> {
        let mut params = Vec::new();
        if let Some(s) = sort {
            params.push(("sort", s));
        }
        let url = url_with_query(
            &format!("{}/networks/{}/pools", self.base_url, network),
            &params,
        );

        let doc: Document<Vec<PoolResource>> = self.get_json(&url).await?;
        Ok(doc.data.into_iter().take(limit).map(PoolResource::into_pool).collect())
    }

    pub async fn pool_detail(&self, network: &str, address: &str) -> AnalysisResult<Pool> {
        let url = format!("{}/networks/{}/pools/{}", self.base_url, network, address);
        let doc: Document<PoolResource> = self.get_json(&url).await?;
        Ok(doc.data.into_pool())
    }

    /// Pool OHLCV series. `bucket` is one of day/hour/minute with an
    /// aggregation factor, newest data first upstream; the result is
    /// returned oldest-first.
    pub async fn pool_ohlcv(
        &self,
        network: &str,
        address: &str,
        bucket: &str,
        aggregate: u32,
        before_timestamp: Option<i64>,
        limit: usize,
    ) -> AnalysisResult<Vec<Candle>> {
        let aggregate = aggregate.to_string();
        let limit_str = limit.to_string();
        let mut params = vec![
            ("aggregate", aggregate.as_str()),
            ("limit", limit_str.as_str()),
            ("currency", "usd"),
        ];
        let before;
        if let Some(ts) = before_timestamp {
            before = ts.to_string();
            params.push(("before_timestamp", before.as_str()));
        }

        let url = url_with_query(
            &format!(
                "{}/networks/{}/pools/{}/ohlcv/{}",
                self.base_url, network, address, bucket
            ),
            &params,
        );

        #[derive(Debug, Deserialize)]
        struct OhlcvAttributes {
            #[serde(default)]
            ohlcv_list: Vec<[f64; 6]>,
        }

        let doc: Document<Resource<OhlcvAttributes>> = self.get_json(&url).await?;
        let mut candles: Vec<Candle> = doc
            .data
            .attributes
            .ohlcv_list
            .iter()
            .map(|row| Candle::new(row[0] as i64, row[1], row[2], row[3], row[4], row[5]))
            .collect();
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }

    pub async fn token_info(&self, network: &str, address: &str) -> AnalysisResult<TokenInfo> {
        let url = format!("{}/networks/{}/tokens/{}", self.base_url, network, address);
        let doc: Document<Resource<TokenAttributes>> = self.get_json(&url).await?;
        let attrs = doc.data.attributes;
        Ok(TokenInfo {
            address: attrs.address.unwrap_or_default(),
            name: attrs.name.unwrap_or_default(),
            symbol: attrs.symbol.unwrap_or_default(),
            price_usd: parse_num(&attrs.price_usd),
            volume_24h_usd: attrs.volume_usd.get("h24").and_then(parse_num_ref),
            total_reserve_usd: parse_num(&attrs.total_reserve_in_usd),
            market_cap_usd: parse_num(&attrs.market_cap_usd),
        })
    }

    pub async fn dexes(&self, network: &str) -> AnalysisResult<Vec<DexInfo>> {
        let url = format!("{}/networks/{}/dexes", self.base_url, network);
        let doc: Document<Vec<Resource<NamedAttributes>>> = self.get_json(&url).await?;
        Ok(doc
            .data
            .into_iter()
            .map(|r| DexInfo {
                name: r.attributes.name.unwrap_or_else(|| r.id.clone()),
                id: r.id,
            })
            .collect())
    }

    pub async fn networks(&self) -> AnalysisResult<Vec<NetworkInfo>> {
        let url = format!("{}/networks", self.base_url);
        let doc: Document<Vec<Resource<NamedAttributes>>> = self.get_json(&url).await?;
        Ok(doc
            .data
            .into_iter()
            .map(|r| NetworkInfo {
                name: r.attributes.name.unwrap_or_else(|| r.id.clone()),
                id: r.id,
            })
            .collect())
    }

    /// The cross-network pool listing was retired upstream; surface that
    /// instead of issuing a request that can only fail.
    pub async fn global_pools(&self) -> AnalysisResult<Vec<Pool>> {
        Err(AnalysisError::NotSupported(
            "the global pools endpoint is deprecated upstream; query per-network pools instead"
                .to_string(),
        ))
    }

    /// Fallback snapshot: the deepest pool matching the symbol stands in
    /// for an aggregated quote. Fields the DEX side cannot supply stay
    /// empty.
    pub async fn snapshot_for_symbol(&self, symbol: &str) -> AnalysisResult<PriceSnapshot> {
        let pools = self.search_pools(symbol, None, 20).await?;
        let best = pools
            .into_iter()
            .filter(|p| p.base_token_price_usd.is_some())
            .max_by(|a, b| {
                a.reserve_usd
                    .unwrap_or(0.0)
                    .partial_cmp(&b.reserve_usd.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| AnalysisError::InvalidSymbol(symbol.to_string()))?;

        let mut snapshot = PriceSnapshot::new(
            symbol.to_uppercase(),
            best.base_token_price_usd.unwrap_or_default(),
            Utc::now().timestamp(),
        );
        snapshot.name = Some(best.name.clone());
        snapshot.volume_24h = best.volume_24h_usd;
        snapshot.change_24h_pct = best.price_change_24h_pct;
        if let (Some(price), Some(pct)) = (best.base_token_price_usd, best.price_change_24h_pct) {
            snapshot.change_24h = Some(price - price / (1.0 + pct / 100.0));
        }
        Ok(snapshot)
    }
}

// JSON:API envelope types

#[derive(Debug, Deserialize)]
struct Document<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    #[serde(default)]
    id: String,
    attributes: A,
}

#[derive(Debug, Deserialize)]
struct NamedAttributes {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenAttributes {
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    price_usd: Option<String>,
    total_reserve_in_usd: Option<String>,
    market_cap_usd: Option<String>,
    #[serde(default)]
    volume_usd: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
struct PoolResource {
    id: String,
    attributes: PoolAttributes,
    #[serde(default)]
    relationships: Option<PoolRelationships>,
}

#[derive(Debug, Deserialize)]
struct PoolAttributes {
    name: Option<String>,
    address: Option<String>,
    base_token_price_usd: Option<String>,
    reserve_in_usd: Option<String>,
    #[serde(default)]
    volume_usd: BTreeMap<String, Option<String>>,
    #[serde(default)]
    price_change_percentage: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Deserialize)]
struct PoolRelationships {
    dex: Option<Relationship>,
    network: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Option<RelationshipId>,
}

#[derive(Debug, Deserialize)]
struct RelationshipId {
    id: String,
}

impl PoolResource {
    fn into_pool(self) -> Pool {
        let rel_id = |rel: &Option<Relationship>| {
            rel.as_ref()
                .and_then(|r| r.data.as_ref())
                .map(|d| d.id.clone())
        };

        // Pool ids are "<network>_<address>"; fall back to that prefix
        // when the relationship block is absent
        let network = self
            .relationships
            .as_ref()
            .and_then(|r| rel_id(&r.network))
            .or_else(|| self.id.split('_').next().map(str::to_string))
            .unwrap_or_default();
        let dex = self
            .relationships
            .as_ref()
            .and_then(|r| rel_id(&r.dex))
            .unwrap_or_default();

        Pool {
            address: self.attributes.address.clone().unwrap_or_else(|| {
                self.id.split_once('_').map(|(_, a)| a.to_string()).unwrap_or_default()
            }),
            name: self.attributes.name.clone().unwrap_or_default(),
            network,
            dex,
            base_token_price_usd: parse_num(&self.attributes.base_token_price_usd),
            reserve_usd: parse_num(&self.attributes.reserve_in_usd),
            volume_24h_usd: self.attributes.volume_usd.get("h24").and_then(parse_num_ref),
            price_change_24h_pct: self
                .attributes
                .price_change_percentage
                .get("h24")
                .and_then(parse_num_ref),
            id: self.id,
        }
    }
}

fn parse_num(value: &Option<String>) -> Option<f64> {
    value.as_ref().and_then(|s| s.parse().ok())
}

fn parse_num_ref(value: &Option<String>) -> Option<f64> {
    value.as_ref().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL_JSON: &str = r#"{
        "id": "eth_0xabc123",
        "type": "pool",
        "attributes": {
            "name": "WETH / USDC 0.05%",
            "address": "0xabc123",
            "base_token_price_usd": "3450.25",
            "reserve_in_usd": "125000000.5",
            "volume_usd": {"h1": "100.0", "h24": "98765432.1"},
            "price_change_percentage": {"h24": "-2.35"}
        },
        "relationships": {
            "dex": {"data": {"id": "uniswap_v3", "type": "dex"}},
            "network": {"data": {"id": "eth", "type": "network"}}
        }
    }"#;

    #[test]
    fn test_pool_parsing() {
        let resource: PoolResource = serde_json::from_str(POOL_JSON).unwrap();
        let pool = resource.into_pool();
        assert_eq!(pool.network, "eth");
        assert_eq!(pool.dex, "uniswap_v3");
        assert_eq!(pool.address, "0xabc123");
        assert_eq!(pool.base_token_price_usd, Some(3450.25));
        assert_eq!(pool.reserve_usd, Some(125000000.5));
        assert_eq!(pool.volume_24h_usd, Some(98765432.1));
        assert_eq!(pool.price_change_24h_pct, Some(-2.35));
    }

    #[test]
    fn test_pool_network_falls_back_to_id_prefix() {
        let raw = r#"{
            "id": "solana_8xPool",
            "attributes": {"name": "SOL / USDC", "base_token_price_usd": "142.1"}
        }"#;
        let resource: PoolResource = serde_json::from_str(raw).unwrap();
        let pool = resource.into_pool();
        assert_eq!(pool.network, "solana");
        assert_eq!(pool.address, "8xPool");
        assert_eq!(pool.dex, "");
    }

    #[test]
    fn test_token_attributes_parsing() {
        let raw = r#"{
            "data": {
                "id": "eth_0xdef",
                "attributes": {
                    "address": "0xdef",
                    "name": "Wrapped Ether",
                    "symbol": "WETH",
                    "price_usd": "3451.0",
                    "total_reserve_in_usd": "500000000",
                    "volume_usd": {"h24": "1000000"}
                }
            }
        }"#;
        let doc: Document<Resource<TokenAttributes>> = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.data.attributes.symbol.as_deref(), Some("WETH"));
        assert_eq!(parse_num(&doc.data.attributes.price_usd), Some(3451.0));
    }

    #[tokio::test]
    async fn test_global_pools_is_not_supported() {
        let client = GeckoTerminalClient::new("http://localhost:0");
        let err = client.global_pools().await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotSupported(_)));
        assert!(err.to_string().contains("deprecated"));
    }
}
