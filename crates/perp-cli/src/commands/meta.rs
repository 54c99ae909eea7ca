//! 마켓 메타데이터 덤프.

use std::time::Duration;

use anyhow::{Context, Result};
use perp_stream::MarketHub;
use tracing::info;

use super::render::{render, render_snapshot, OutputFormat};

/// 메타데이터 덤프 설정.
#[derive(Debug, Clone)]
pub struct MetaConfig {
    /// 특정 코인만 출력
    pub coin: Option<String>,
    pub format: OutputFormat,
    /// 초기화 대기 한도
    pub timeout: Duration,
}

/// 연결 후 `metaAndAssetCtxs` 스냅샷을 받아 출력합니다. 출력한 마켓 수를 반환합니다.
pub async fn dump_meta(hub: &MarketHub, config: MetaConfig) -> Result<usize> {
    hub.connect(None)
        .await
        .context("failed to connect to the exchange")?;

    let result = fetch(hub, &config).await;
    hub.disconnect();
    result
}

async fn fetch(hub: &MarketHub, config: &MetaConfig) -> Result<usize> {
    hub.wait_until_initialized(config.timeout)
        .await
        .context("market metadata did not arrive in time")?;
    let snapshot = hub
        .market_snapshot()
        .context("market snapshot missing after initialization")?;
    info!(markets = snapshot.len(), "메타데이터 수신");

    match &config.coin {
        Some(coin) => {
            let market = snapshot
                .market(coin)
                .with_context(|| format!("unknown coin: {}", coin))?;
            match config.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(market)?),
                OutputFormat::Text => println!(
                    "{} (asset {}) szDecimals {} maxLeverage {}{}\n{}",
                    market.coin,
                    market.asset_id,
                    market.sz_decimals,
                    market.max_leverage,
                    if market.only_isolated { " isolated-only" } else { "" },
                    render(
                        &perp_stream::FeedEvent::AssetContext(market.context.clone()),
                        OutputFormat::Text
                    )
                    .unwrap_or_default()
                ),
            }
            Ok(1)
        }
        None => {
            match config.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?)
                }
                OutputFormat::Text => println!("{}", render_snapshot(&snapshot)),
            }
            Ok(snapshot.active_markets().count())
        }
    }
}
