//! Tool registry: names, descriptions and input schemas served by
//! `tools/list`.

use serde_json::{json, Value};

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

const TIMEFRAME_DESC: &str = "Timeframe: 4h, daily, weekly or monthly (default daily)";
const RISK_DESC: &str = "Risk level: conservative, moderate or aggressive (default moderate)";

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "get_crypto_price",
            description: "Current price snapshot for a cryptocurrency: price, 24h change, volume, market cap, interval percent changes and all-time high",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol, e.g. BTC"},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "get_technical_indicators",
            description: "Latest values and verdicts for a selectable set of technical indicators (SMA, EMA, RSI, MACD, Bollinger, Stochastic, Williams %R, OBV)",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                    "timeframe": {"type": "string", "description": TIMEFRAME_DESC},
                    "indicators": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Indicator names to compute; omit for all",
                    },
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "detect_chart_patterns",
            description: "Chart and candlestick pattern detection with confidence scores, key points and price targets",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                    "timeframe": {"type": "string", "description": TIMEFRAME_DESC},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "get_support_resistance",
            description: "Support and resistance levels from pivot clustering, volume profile, Fibonacci retracements and psychological round numbers",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                    "timeframe": {"type": "string", "description": TIMEFRAME_DESC},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "get_trading_signals",
            description: "Composite trading signal with confidence, entry, stop loss, take profit and written rationale",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                    "risk_level": {"type": "string", "description": RISK_DESC},
                    "timeframe": {"type": "string", "description": TIMEFRAME_DESC},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "get_full_analysis",
            description: "Complete technical analysis: indicators, patterns, levels, trading signal, summary and recommendations",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                    "timeframe": {"type": "string", "description": TIMEFRAME_DESC},
                    "risk_level": {"type": "string", "description": RISK_DESC},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "multi_timeframe_analysis",
            description: "Trend, signal and pattern picture across the 4h, daily, weekly and monthly timeframes with an alignment summary",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Ticker symbol"},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "get_token_liquidity",
            description: "Total DEX liquidity for a token: pool count and the deepest pools",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Token symbol"},
                    "network": {"type": "string", "description": "Network id, e.g. eth (optional)"},
                }),
                &["symbol"],
            ),
        },
        ToolSpec {
            name: "search_tokens_by_network",
            description: "Search tokens trading on one network, with aggregated pool liquidity",
            input_schema: schema(
                json!({
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                    "query": {"type": "string", "description": "Search text (optional)"},
                    "limit": {"type": "integer", "description": "Maximum results (default 10)"},
                }),
                &["network"],
            ),
        },
        ToolSpec {
            name: "compare_dex_prices",
            description: "Per-DEX prices for a token on one network: best, worst, average and spread",
            input_schema: schema(
                json!({
                    "symbol": {"type": "string", "description": "Token symbol"},
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                }),
                &["symbol", "network"],
            ),
        },
        ToolSpec {
            name: "get_network_pools",
            description: "Top liquidity pools on a network, sorted by volume or transactions",
            input_schema: schema(
                json!({
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                    "sort_by": {"type": "string", "description": "volume (default) or transactions"},
                    "limit": {"type": "integer", "description": "Maximum results (default 10)"},
                }),
                &["network"],
            ),
        },
        ToolSpec {
            name: "get_dex_info",
            description: "Decentralized exchanges available on a network",
            input_schema: schema(
                json!({
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                }),
                &["network"],
            ),
        },
        ToolSpec {
            name: "get_pool_analytics",
            description: "Full detail for one liquidity pool: price, reserve, volume and 24h change",
            input_schema: schema(
                json!({
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                    "pool_address": {"type": "string", "description": "Pool contract address"},
                }),
                &["network", "pool_address"],
            ),
        },
        ToolSpec {
            name: "get_pool_ohlcv",
            description: "OHLCV candle series for a pool with basic statistics",
            input_schema: schema(
                json!({
                    "network": {"type": "string", "description": "Network id, e.g. eth"},
                    "pool_address": {"type": "string", "description": "Pool contract address"},
                    "start_date": {"type": "string", "description": "Start date, YYYY-MM-DD"},
                    "end_date": {"type": "string", "description": "End date, YYYY-MM-DD (default today)"},
                    "interval": {"type": "string", "description": "Candle interval: 1m, 5m, 15m, 1h, 4h, 12h or 1d (default 1d)"},
                }),
                &["network", "pool_address", "start_date"],
            ),
        },
        ToolSpec {
            name: "get_available_networks",
            description: "Networks known to the DEX data source",
            input_schema: schema(json!({}), &[]),
        },
        ToolSpec {
            name: "search_tokens_advanced",
            description: "Token search across all networks, filtered by minimum liquidity and volume, sorted by liquidity",
            input_schema: schema(
                json!({
                    "query": {"type": "string", "description": "Search text"},
                    "min_liquidity": {"type": "number", "description": "Minimum pool liquidity in USD"},
                    "min_volume": {"type": "number", "description": "Minimum 24h volume in USD"},
                    "limit": {"type": "integer", "description": "Maximum results (default 10)"},
                }),
                &["query"],
            ),
        },
    ]
}

pub fn tools_as_json() -> Value {
    let tools: Vec<Value> = tool_specs()
        .into_iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_complete() {
        let specs = tool_specs();
        assert_eq!(specs.len(), 16);

        let names: Vec<&str> = specs.iter().map(|t| t.name).collect();
        for expected in [
            "get_crypto_price",
            "get_technical_indicators",
            "detect_chart_patterns",
            "get_support_resistance",
            "get_trading_signals",
            "get_full_analysis",
            "multi_timeframe_analysis",
            "get_token_liquidity",
            "search_tokens_by_network",
            "compare_dex_prices",
            "get_network_pools",
            "get_dex_info",
            "get_pool_analytics",
            "get_pool_ohlcv",
            "get_available_networks",
            "search_tokens_advanced",
        ] {
            assert!(names.contains(&expected), "missing tool {}", expected);
        }
    }

    #[test]
    fn test_every_tool_has_object_schema() {
        for spec in tool_specs() {
            assert_eq!(spec.input_schema["type"], "object");
            assert!(spec.input_schema["required"].is_array());
            assert!(!spec.description.is_empty());
        }
    }

    #[test]
    fn test_listing_shape() {
        let listing = tools_as_json();
        let tools = listing["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 16);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }
}
