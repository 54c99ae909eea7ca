//! 피드 이벤트를 터미널 한 줄로 표현합니다.

use perp_core::{MarketSnapshot, OrderBook};
use perp_stream::FeedEvent;
use rust_decimal::Decimal;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: text, json", s)),
        }
    }
}

/// 호가창 출력 시 보여줄 단계 수.
const BOOK_DEPTH: usize = 5;

/// 이벤트 한 건을 출력용 문자열로 변환합니다. 출력할 것이 없으면 `None`.
pub fn render(event: &FeedEvent, format: OutputFormat) -> Option<String> {
    if format == OutputFormat::Json {
        return render_json(event);
    }

    let line = match event {
        FeedEvent::OrderBook(book) => render_book(book),
        FeedEvent::Trades(trades) => trades
            .iter()
            .map(|t| {
                format!(
                    "{} {} {:>5} {} @ {}",
                    t.timestamp.format("%H:%M:%S%.3f"),
                    t.coin,
                    t.side,
                    t.size,
                    t.price
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        FeedEvent::Candle(c) => format!(
            "{} {} {} O {} H {} L {} C {} V {} ({} trades)",
            c.open_time.format("%Y-%m-%d %H:%M"),
            c.coin,
            c.interval,
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume,
            c.trades
        ),
        FeedEvent::AllMids(mids) => {
            let mut entries: Vec<_> = mids.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries
                .iter()
                .map(|(coin, px)| format!("{:<10} {}", coin, px))
                .collect::<Vec<_>>()
                .join("\n")
        }
        FeedEvent::AssetContext(ctx) => format!(
            "{} mark {} oracle {} funding {} OI {} 24h {}",
            ctx.coin,
            ctx.mark_price,
            ctx.oracle_price,
            ctx.funding,
            ctx.open_interest,
            ctx.change_24h_pct()
                .map(percent)
                .unwrap_or_else(|| "-".to_string())
        ),
        FeedEvent::Account(account) => {
            let mut lines = vec![format!(
                "{} value {} margin used {} withdrawable {}",
                account.user.short(),
                account.margin.account_value,
                account.margin.total_margin_used,
                account.margin.withdrawable
            )];
            for p in &account.positions {
                lines.push(format!(
                    "  {:<8} size {} entry {} uPnL {}",
                    p.coin,
                    p.size,
                    p.entry_price
                        .map(|px| px.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    p.unrealized_pnl
                ));
            }
            lines.join("\n")
        }
        FeedEvent::HistoricalOrders(history) => format!(
            "{} historical orders: {}{}",
            history.user.short(),
            history.orders.len(),
            if history.is_snapshot { " (snapshot)" } else { "" }
        ),
        FeedEvent::Metadata(snapshot) => render_snapshot(snapshot),
        FeedEvent::Connection(status) => format!(
            "[connection] {} (attempts {}){}",
            status.state,
            status.attempts,
            status
                .last_error
                .as_ref()
                .map(|e| format!(": {}", e))
                .unwrap_or_default()
        ),
        FeedEvent::Raw { channel, data } => format!("[{}] {}", channel, data),
    };

    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

fn render_json(event: &FeedEvent) -> Option<String> {
    let value = match event {
        FeedEvent::OrderBook(book) => serde_json::to_value(book),
        FeedEvent::Trades(trades) => serde_json::to_value(trades),
        FeedEvent::Candle(candle) => serde_json::to_value(candle),
        FeedEvent::AllMids(mids) => serde_json::to_value(mids),
        FeedEvent::AssetContext(ctx) => serde_json::to_value(ctx),
        FeedEvent::Account(account) => serde_json::to_value(account),
        FeedEvent::HistoricalOrders(history) => serde_json::to_value(history),
        FeedEvent::Metadata(snapshot) => serde_json::to_value(snapshot.as_ref()),
        FeedEvent::Connection(status) => serde_json::to_value(status),
        FeedEvent::Raw { data, .. } => Ok(data.clone()),
    };
    value.ok().map(|v| v.to_string())
}

fn render_book(book: &OrderBook) -> String {
    let mut lines = vec![format!(
        "{} spread {} mid {}",
        book.coin,
        book.spread()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string()),
        book.mid_price()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string())
    )];

    for ask in book.asks.iter().take(BOOK_DEPTH).rev() {
        lines.push(format!("  ask {:>14} {:>14} {:>14}", ask.price, ask.size, ask.total));
    }
    for bid in book.bids.iter().take(BOOK_DEPTH) {
        lines.push(format!("  bid {:>14} {:>14} {:>14}", bid.price, bid.size, bid.total));
    }
    lines.join("\n")
}

/// 마켓 스냅샷 표.
pub fn render_snapshot(snapshot: &MarketSnapshot) -> String {
    let mut lines = vec![format!(
        "{:<4} {:<10} {:>14} {:>12} {:>6} {:>8}",
        "id", "coin", "mark", "funding", "lev", "szDec"
    )];
    for m in snapshot.active_markets() {
        lines.push(format!(
            "{:<4} {:<10} {:>14} {:>12} {:>6} {:>8}",
            m.asset_id,
            m.coin,
            m.context.mark_price,
            m.context.funding,
            m.max_leverage,
            m.sz_decimals
        ));
    }
    lines.push(format!("{} markets ({:?})", snapshot.len(), snapshot.source));
    lines.join("\n")
}

fn percent(ratio: Decimal) -> String {
    format!("{:+.2}%", (ratio * Decimal::ONE_HUNDRED).round_dp(2))
}
