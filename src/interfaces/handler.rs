//! Tool dispatch.
//!
//! Maps each tool call onto the analytics pipelines and renders a JSON
//! map. Failures stay in-band as `{"error": ...}` payloads; the JSON-RPC
//! envelope never carries tool failures. Full-analysis results are
//! memoized per (symbol, timeframe, risk).

use crate::application::analysis::{AnalysisService, FullAnalysis};
use crate::application::indicators::{IndicatorEngine, IndicatorKind};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::level::Level;
use crate::domain::pattern::ChartPattern;
use crate::domain::risk::RiskLevel;
use crate::domain::timeframe::Timeframe;
use crate::infrastructure::core::cache::TtlCache;
use crate::infrastructure::geckoterminal::{GeckoTerminalClient, Pool};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const ANALYSIS_TTL: Duration = Duration::from_secs(120);

pub struct ToolHandler {
    analysis: AnalysisService,
    dex: Arc<GeckoTerminalClient>,
    analysis_cache: TtlCache<(String, Timeframe, RiskLevel), FullAnalysis>,
}

impl ToolHandler {
    pub fn new(analysis: AnalysisService, dex: Arc<GeckoTerminalClient>) -> Self {
        Self {
            analysis,
            dex,
            analysis_cache: TtlCache::new(ANALYSIS_TTL),
        }
    }

    /// Run a tool. `None` means the tool name is unknown; any tool-level
    /// failure is rendered in-band as `{"error": ...}`.
    pub async fn call(&self, name: &str, args: &Value) -> Option<Value> {
        info!(tool = name, "tool call");
        let result = match name {
            "get_crypto_price" => self.crypto_price(args).await,
            "get_technical_indicators" => self.technical_indicators(args).await,
            "detect_chart_patterns" => self.chart_patterns(args).await,
            "get_support_resistance" => self.support_resistance(args).await,
            "get_trading_signals" => self.trading_signals(args).await,
            "get_full_analysis" => self.full_analysis(args).await,
            "multi_timeframe_analysis" => self.multi_timeframe(args).await,
            "get_token_liquidity" => self.token_liquidity(args).await,
            "search_tokens_by_network" => self.tokens_by_network(args).await,
            "compare_dex_prices" => self.compare_dex_prices(args).await,
            "get_network_pools" => self.network_pools(args).await,
            "get_dex_info" => self.dex_info(args).await,
            "get_pool_analytics" => self.pool_analytics(args).await,
            "get_pool_ohlcv" => self.pool_ohlcv(args).await,
            "get_available_networks" => self.available_networks().await,
            "search_tokens_advanced" => self.tokens_advanced(args).await,
            _ => return None,
        };

        Some(result.unwrap_or_else(|e| json!({ "error": e.to_string() })))
    }

    async fn cached_full(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        risk: RiskLevel,
    ) -> AnalysisResult<FullAnalysis> {
        let key = (symbol.to_uppercase(), timeframe, risk);
        self.analysis_cache
            .get_or_fetch(key, || self.analysis.full_analysis(symbol, timeframe, risk))
            .await
    }

    async fn crypto_price(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let snapshot = self.analysis.snapshot(&symbol).await?;
        serde_json::to_value(&snapshot)
            .map_err(|e| AnalysisError::Unknown(format!("snapshot serialization: {}", e)))
    }

    async fn technical_indicators(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let timeframe = parse_timeframe(args)?;
        let kinds = parse_indicators(args)?;

        let (series, data_points) = self
            .analysis
            .indicator_values(&symbol, timeframe, &kinds)
            .await?;

        let mut indicators = BTreeMap::new();
        for s in &series {
            if let Some(latest) = s.latest() {
                indicators.insert(latest.name.clone(), serde_json::to_value(latest).ok());
            }
        }

        let latest = IndicatorEngine::latest_values(&series);
        let verdicts: Vec<_> = latest.iter().map(|v| v.signal).collect();
        let composite = IndicatorEngine::composite(&verdicts);

        Ok(json!({
            "symbol": symbol.to_uppercase(),
            "timeframe": timeframe.label(),
            "data_points": data_points,
            "indicators": indicators,
            "composite": {
                "signal": composite.signal.label(),
                "score": composite.score,
                "confidence": composite.confidence,
            },
        }))
    }

    async fn chart_patterns(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let timeframe = parse_timeframe(args)?;
        let patterns = self.analysis.chart_patterns(&symbol, timeframe).await?;

        Ok(json!({
            "symbol": symbol.to_uppercase(),
            "timeframe": timeframe.label(),
            "count": patterns.len(),
            "patterns": patterns.iter().map(pattern_json).collect::<Vec<_>>(),
        }))
    }

    async fn support_resistance(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let timeframe = parse_timeframe(args)?;
        let (analysis, price) = self.analysis.support_resistance(&symbol, timeframe).await?;

        let (support, resistance): (Vec<&Level>, Vec<&Level>) =
            analysis.levels.iter().partition(|l| l.price < price);

        Ok(json!({
            "symbol": symbol.to_uppercase(),
            "timeframe": timeframe.label(),
            "current_price": price,
            "support": support.iter().map(|l| level_json(l)).collect::<Vec<_>>(),
            "resistance": resistance.iter().map(|l| level_json(l)).collect::<Vec<_>>(),
            "nearest_support": analysis.nearest_below(price).map(level_json),
            "nearest_resistance": analysis.nearest_above(price).map(level_json),
            "trend_lines": analysis.trend_lines.iter().map(|t| json!({
                "slope": t.slope,
                "intercept": t.intercept,
                "kind": t.kind.to_string(),
                "touches": t.touches,
            })).collect::<Vec<_>>(),
        }))
    }

    async fn trading_signals(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let timeframe = parse_timeframe(args)?;
        let risk = parse_risk(args)?;

        let full = self.cached_full(&symbol, timeframe, risk).await?;
        let signal = &full.signal;

        Ok(json!({
            "symbol": full.snapshot.symbol,
            "timeframe": timeframe.label(),
            "risk_level": risk.label(),
            "signal": signal.signal.label(),
            "confidence": signal.confidence,
            "entry": signal.entry,
            "stop_loss": signal.stop_loss,
            "take_profit": signal.take_profit,
            "reasoning": signal.reasoning,
            "breakdown": signal.breakdown.iter().map(|c| json!({
                "source": c.source,
                "signal": c.signal.label(),
                "detail": c.detail,
            })).collect::<Vec<_>>(),
        }))
    }

    async fn full_analysis(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let timeframe = parse_timeframe(args)?;
        let risk = parse_risk(args)?;

        let full = self.cached_full(&symbol, timeframe, risk).await?;

        let mut indicators = BTreeMap::new();
        for s in &full.indicators {
            if let Some(latest) = s.latest() {
                indicators.insert(latest.name.clone(), serde_json::to_value(latest).ok());
            }
        }

        let price = full.snapshot.price;
        let (support, resistance): (Vec<&Level>, Vec<&Level>) =
            full.levels.levels.iter().partition(|l| l.price < price);

        Ok(json!({
            "symbol": full.snapshot.symbol,
            "timeframe": timeframe.label(),
            "risk_level": risk.label(),
            "snapshot": serde_json::to_value(&full.snapshot).unwrap_or(Value::Null),
            "data_points": full.data_points,
            "indicators": indicators,
            "composite": {
                "signal": full.composite.signal.label(),
                "score": full.composite.score,
                "confidence": full.composite.confidence,
            },
            "patterns": full.patterns.iter().map(pattern_json).collect::<Vec<_>>(),
            "support": support.iter().map(|l| level_json(l)).collect::<Vec<_>>(),
            "resistance": resistance.iter().map(|l| level_json(l)).collect::<Vec<_>>(),
            "signal": {
                "signal": full.signal.signal.label(),
                "confidence": full.signal.confidence,
                "entry": full.signal.entry,
                "stop_loss": full.signal.stop_loss,
                "take_profit": full.signal.take_profit,
                "reasoning": full.signal.reasoning,
            },
            "summary": full.summary,
            "recommendations": full.recommendations,
        }))
    }

    async fn multi_timeframe(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let multi = self.analysis.multi_timeframe(&symbol).await?;

        let mut timeframes = BTreeMap::new();
        for tf in &multi.timeframes {
            timeframes.insert(
                tf.timeframe.label().to_string(),
                json!({
                    "trend": tf.trend.to_string(),
                    "overall_signal": tf.composite.signal.label(),
                    "confidence": tf.composite.confidence,
                    "indicators": tf.indicators.iter()
                        .filter_map(|v| serde_json::to_value(v).ok())
                        .collect::<Vec<_>>(),
                    "patterns": tf.patterns.iter().map(pattern_json).collect::<Vec<_>>(),
                    "levels": tf.levels.iter().map(|l| level_json(l)).collect::<Vec<_>>(),
                }),
            );
        }

        Ok(json!({
            "symbol": multi.snapshot.symbol,
            "price": multi.snapshot.price,
            "timeframes": timeframes,
            "summary": multi.summary,
        }))
    }

    async fn token_liquidity(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let network = opt_str(args, "network");

        let pools = self
            .dex
            .search_pools(&symbol, network.as_deref(), 50)
            .await?;
        if pools.is_empty() {
            return Err(AnalysisError::InvalidSymbol(symbol));
        }

        let total: f64 = pools.iter().filter_map(|p| p.reserve_usd).sum();
        let mut ranked = pools.clone();
        ranked.sort_by(|a, b| {
            b.reserve_usd
                .unwrap_or(0.0)
                .partial_cmp(&a.reserve_usd.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(json!({
            "symbol": symbol.to_uppercase(),
            "network": network,
            "total_liquidity_usd": total,
            "pool_count": pools.len(),
            "top_pools": ranked.iter().take(5).map(pool_json).collect::<Vec<_>>(),
        }))
    }

    async fn tokens_by_network(&self, args: &Value) -> AnalysisResult<Value> {
        let network = require_str(args, "network")?;
        let query = opt_str(args, "query");
        let limit = opt_usize(args, "limit").unwrap_or(10);

        let pools = match &query {
            Some(q) if !q.is_empty() => {
                self.dex.search_pools(q, Some(&network), limit).await?
            }
            _ => {
                self.dex
                    .network_pools(&network, Some("h24_volume_usd_desc"), limit)
                    .await?
            }
        };

        let tokens: Vec<Value> = pools
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "pool_address": p.address,
                    "dex": p.dex,
                    "price_usd": p.base_token_price_usd,
                    "liquidity_usd": p.reserve_usd,
                    "volume_24h_usd": p.volume_24h_usd,
                })
            })
            .collect();

        Ok(json!({
            "network": network,
            "query": query,
            "count": tokens.len(),
            "tokens": tokens,
        }))
    }

    async fn compare_dex_prices(&self, args: &Value) -> AnalysisResult<Value> {
        let symbol = require_str(args, "symbol")?;
        let network = require_str(args, "network")?;

        let pools = self.dex.search_pools(&symbol, Some(&network), 50).await?;

        // Deepest pool per DEX carries that DEX's quote
        let mut by_dex: BTreeMap<String, &Pool> = BTreeMap::new();
        for pool in pools.iter().filter(|p| p.base_token_price_usd.is_some()) {
            let entry = by_dex.entry(pool.dex.clone()).or_insert(pool);
            if pool.reserve_usd.unwrap_or(0.0) > entry.reserve_usd.unwrap_or(0.0) {
                *entry = pool;
            }
        }

        if by_dex.is_empty() {
            return Err(AnalysisError::InvalidSymbol(format!(
                "{} has no priced pools on {}",
                symbol, network
            )));
        }

        let prices: Vec<f64> = by_dex
            .values()
            .filter_map(|p| p.base_token_price_usd)
            .collect();
        let best = prices.iter().cloned().fold(f64::MIN, f64::max);
        let worst = prices.iter().cloned().fold(f64::MAX, f64::min);
        let average = prices.iter().sum::<f64>() / prices.len() as f64;
        let spread_pct = if average > 0.0 {
            (best - worst) / average * 100.0
        } else {
            0.0
        };

        Ok(json!({
            "symbol": symbol.to_uppercase(),
            "network": network,
            "venues": by_dex.iter().map(|(dex, p)| json!({
                "dex": dex,
                "price_usd": p.base_token_price_usd,
                "pool": p.name,
                "pool_address": p.address,
                "liquidity_usd": p.reserve_usd,
            })).collect::<Vec<_>>(),
            "best_price": best,
            "worst_price": worst,
            "average_price": average,
            "spread_pct": spread_pct,
        }))
    }

    async fn network_pools(&self, args: &Value) -> AnalysisResult<Value> {
        let network = require_str(args, "network")?;
        let limit = opt_usize(args, "limit").unwrap_or(10);
        let sort = match opt_str(args, "sort_by").as_deref() {
            Some("transactions") => "h24_tx_count_desc",
            _ => "h24_volume_usd_desc",
        };

        let pools = self.dex.network_pools(&network, Some(sort), limit).await?;
        Ok(json!({
            "network": network,
            "sort_by": sort,
            "count": pools.len(),
            "pools": pools.iter().map(pool_json).collect::<Vec<_>>(),
        }))
    }

    async fn dex_info(&self, args: &Value) -> AnalysisResult<Value> {
        let network = require_str(args, "network")?;
        let dexes = self.dex.dexes(&network).await?;
        Ok(json!({
            "network": network,
            "count": dexes.len(),
            "dexes": dexes.iter().map(|d| json!({
                "id": d.id,
                "name": d.name,
            })).collect::<Vec<_>>(),
        }))
    }

    async fn pool_analytics(&self, args: &Value) -> AnalysisResult<Value> {
        let network = require_str(args, "network")?;
        let address = require_str(args, "pool_address")?;
        let pool = self.dex.pool_detail(&network, &address).await?;
        Ok(pool_json(&pool))
    }

    async fn pool_ohlcv(&self, args: &Value) -> AnalysisResult<Value> {
        let network = require_str(args, "network")?;
        let address = require_str(args, "pool_address")?;
        let start = parse_date(&require_str(args, "start_date")?)?;
        let end = match opt_str(args, "end_date") {
            Some(d) => parse_date(&d)?,
            None => Utc::now().timestamp(),
        };
        if end <= start {
            return Err(AnalysisError::Unknown(
                "end_date must be after start_date".to_string(),
            ));
        }

        let interval = opt_str(args, "interval").unwrap_or_else(|| "1d".to_string());
        let (bucket, aggregate, secs) = interval_bucket(&interval)?;
        let limit = (((end - start) / secs) as usize + 1).min(1000);

        let candles = self
            .dex
            .pool_ohlcv(&network, &address, bucket, aggregate, Some(end), limit)
            .await?;
        let candles: Vec<_> = candles
            .into_iter()
            .filter(|c| c.timestamp >= start)
            .collect();
        if candles.is_empty() {
            return Err(AnalysisError::InsufficientData(format!(
                "no {} candles for pool {} in the requested window",
                interval, address
            )));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let high = candles.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = candles.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let total_volume: f64 = candles.iter().map(|c| c.volume).sum();
        let first = closes.first().copied().unwrap_or(0.0);
        let last = closes.last().copied().unwrap_or(0.0);
        let change_pct = if first > 0.0 {
            (last - first) / first * 100.0
        } else {
            0.0
        };

        Ok(json!({
            "network": network,
            "pool_address": address,
            "interval": interval,
            "count": candles.len(),
            "candles": candles.iter().map(|c| json!({
                "timestamp": c.timestamp,
                "open": c.open,
                "high": c.high,
                "low": c.low,
                "close": c.close,
                "volume": c.volume,
            })).collect::<Vec<_>>(),
            "statistics": {
                "high": high,
                "low": low,
                "average_close": closes.iter().sum::<f64>() / closes.len() as f64,
                "total_volume": total_volume,
                "change_pct": change_pct,
            },
        }))
    }

    async fn available_networks(&self) -> AnalysisResult<Value> {
        let networks = self.dex.networks().await?;
        Ok(json!({
            "count": networks.len(),
            "networks": networks.iter().map(|n| json!({
                "id": n.id,
                "name": n.name,
            })).collect::<Vec<_>>(),
        }))
    }

    async fn tokens_advanced(&self, args: &Value) -> AnalysisResult<Value> {
        let query = require_str(args, "query")?;
        let min_liquidity = opt_f64(args, "min_liquidity").unwrap_or(0.0);
        let min_volume = opt_f64(args, "min_volume").unwrap_or(0.0);
        let limit = opt_usize(args, "limit").unwrap_or(10);

        let mut pools: Vec<Pool> = self
            .dex
            .search_pools(&query, None, 50)
            .await?
            .into_iter()
            .filter(|p| {
                p.reserve_usd.unwrap_or(0.0) >= min_liquidity
                    && p.volume_24h_usd.unwrap_or(0.0) >= min_volume
            })
            .collect();

        pools.sort_by(|a, b| {
            b.reserve_usd
                .unwrap_or(0.0)
                .partial_cmp(&a.reserve_usd.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(json!({
            "query": query,
            "min_liquidity": min_liquidity,
            "min_volume": min_volume,
            "count": pools.len().min(limit),
            "tokens": pools.iter().take(limit).map(pool_json).collect::<Vec<_>>(),
        }))
    }
}

// Argument helpers

fn require_str(args: &Value, key: &str) -> AnalysisResult<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AnalysisError::Unknown(format!("missing required argument: {}", key)))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

fn opt_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn parse_timeframe(args: &Value) -> AnalysisResult<Timeframe> {
    match args.get("timeframe").and_then(Value::as_str) {
        None => Ok(Timeframe::default()),
        Some(s) => {
            Timeframe::from_str(s).map_err(|e| AnalysisError::Unknown(e.to_string()))
        }
    }
}

fn parse_risk(args: &Value) -> AnalysisResult<RiskLevel> {
    match args.get("risk_level").and_then(Value::as_str) {
        None => Ok(RiskLevel::default()),
        Some(s) => RiskLevel::from_str(s).map_err(|e| AnalysisError::Unknown(e.to_string())),
    }
}

fn parse_indicators(args: &Value) -> AnalysisResult<Vec<IndicatorKind>> {
    match args.get("indicators").and_then(Value::as_array) {
        None => Ok(IndicatorKind::all().to_vec()),
        Some(list) if list.is_empty() => Ok(IndicatorKind::all().to_vec()),
        Some(list) => list
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| {
                        AnalysisError::Unknown("indicators must be strings".to_string())
                    })
                    .and_then(|s| {
                        IndicatorKind::from_str(s)
                            .map_err(|e| AnalysisError::Unknown(e.to_string()))
                    })
            })
            .collect(),
    }
}

fn parse_date(s: &str) -> AnalysisResult<i64> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| {
            d.and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or_default()
        })
        .map_err(|_| AnalysisError::Unknown(format!("invalid date '{}', expected YYYY-MM-DD", s)))
}

fn interval_bucket(interval: &str) -> AnalysisResult<(&'static str, u32, i64)> {
    match interval {
        "1m" => Ok(("minute", 1, 60)),
        "5m" => Ok(("minute", 5, 300)),
        "15m" => Ok(("minute", 15, 900)),
        "1h" => Ok(("hour", 1, 3_600)),
        "4h" => Ok(("hour", 4, 14_400)),
        "12h" => Ok(("hour", 12, 43_200)),
        "1d" | "day" => Ok(("day", 1, 86_400)),
        other => Err(AnalysisError::Unknown(format!(
            "unsupported interval '{}'; use 1m, 5m, 15m, 1h, 4h, 12h or 1d",
            other
        ))),
    }
}

// Rendering helpers

fn pattern_json(p: &ChartPattern) -> Value {
    json!({
        "name": p.kind.label(),
        "kind": p.kind,
        "confidence": p.confidence,
        "is_bullish": p.is_bullish(),
        "is_reversal": p.is_reversal(),
        "start_time": p.start_time,
        "end_time": p.end_time,
        "description": p.description,
        "target": p.target,
        "stop_loss": p.stop_loss,
        "key_points": p.key_points.iter().map(|kp| json!({
            "timestamp": kp.timestamp,
            "price": kp.price,
            "kind": kp.kind,
        })).collect::<Vec<_>>(),
    })
}

fn level_json(l: &Level) -> Value {
    json!({
        "price": l.price,
        "strength": l.strength,
        "kind": l.kind.to_string(),
        "touches": l.touches,
        "last_touch": l.last_touch,
        "is_active": l.is_active,
    })
}

fn pool_json(p: &Pool) -> Value {
    json!({
        "id": p.id,
        "address": p.address,
        "name": p.name,
        "network": p.network,
        "dex": p.dex,
        "price_usd": p.base_token_price_usd,
        "liquidity_usd": p.reserve_usd,
        "volume_24h_usd": p.volume_24h_usd,
        "change_24h_pct": p.price_change_24h_pct,
    })
}
