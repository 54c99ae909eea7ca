//! 인바운드 메시지 분류 및 정규화.
//!
//! `{channel, data}` 봉투의 `channel` 값으로 핸들러를 하나 고르고, 원시 페이로드를
//! `perp_core` 도메인 타입으로 변환합니다. 알 수 없는 채널은 `Channel::Raw`로 그대로
//! 전달됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use perp_core::{
    parse_decimal_opt, AccountSnapshot, Address, BookLevel, Candle, CandleInterval,
    HistoricalOrder, HistoricalOrders, MarginSummary, OpenOrder, OrderBook, PositionSummary,
    Side, SnapshotSource, Trade,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{FeedError, FeedResult};
use crate::event::FeedEvent;
use crate::metadata::{asset_context, build_snapshot, decimal};
use crate::wire::{
    InboundEnvelope, RawActiveAssetCtx, RawAllMids, RawBook, RawCandle, RawHistoricalOrders,
    RawLevel, RawOrder, RawPostResponse, RawSubscriptionAck, RawTrade, RawWebData2,
};

/// 라우팅 결과.
#[derive(Debug)]
pub enum Routed {
    /// 채널별로 발행할 이벤트
    Publish(Vec<(Channel, FeedEvent)>),
    /// `post` 요청 응답
    PostResponse {
        id: u64,
        outcome: Result<Value, String>,
    },
    /// 구독/구독 해제 확인
    SubscriptionAck { channel: Channel, subscribed: bool },
    /// ping 응답
    Pong,
    /// 서버 에러 메시지
    ServerError(String),
}

/// 원본 텍스트 프레임을 분류합니다.
pub fn route(text: &str) -> FeedResult<Routed> {
    let envelope: InboundEnvelope = serde_json::from_str(text)?;
    route_envelope(envelope)
}

pub fn route_envelope(envelope: InboundEnvelope) -> FeedResult<Routed> {
    let InboundEnvelope { channel, data } = envelope;

    let routed = match channel.as_str() {
        "l2Book" => {
            let book = order_book(decode(data)?)?;
            publish(Channel::order_book(book.coin.clone()), FeedEvent::OrderBook(book))
        }
        "trades" => {
            let raw: Vec<RawTrade> = decode(data)?;
            let Some(coin) = raw.first().map(|t| t.coin.clone()) else {
                return Ok(Routed::Publish(Vec::new()));
            };
            let trades = raw.iter().map(trade).collect::<FeedResult<Vec<_>>>()?;
            publish(Channel::trades(coin), FeedEvent::Trades(trades))
        }
        "candle" => {
            let candle = candle(decode(data)?)?;
            let channel = Channel::candle(candle.coin.clone(), candle.interval);
            publish(channel, FeedEvent::Candle(candle))
        }
        "allMids" => {
            let raw: RawAllMids = decode(data)?;
            let mids = raw
                .mids
                .iter()
                .map(|(coin, px)| Ok((coin.clone(), decimal("mid", px)?)))
                .collect::<FeedResult<HashMap<_, _>>>()?;
            publish(Channel::AllMids, FeedEvent::AllMids(mids))
        }
        "activeAssetCtx" => {
            let raw: RawActiveAssetCtx = decode(data)?;
            let ctx = asset_context(&raw.coin, &raw.ctx)?;
            publish(Channel::asset_context(raw.coin), FeedEvent::AssetContext(ctx))
        }
        "webData2" => web_data(decode(data)?)?,
        "userHistoricalOrders" => {
            let orders = historical_orders(decode(data)?)?;
            let channel = Channel::historical_orders(orders.user.clone());
            publish(channel, FeedEvent::HistoricalOrders(orders))
        }
        "post" => {
            let raw: RawPostResponse = decode(data)?;
            let outcome = if raw.response.kind == "error" {
                Err(value_text(&raw.response.payload))
            } else {
                Ok(raw.response.payload)
            };
            Routed::PostResponse {
                id: raw.id,
                outcome,
            }
        }
        "subscriptionResponse" => {
            let raw: RawSubscriptionAck = decode(data)?;
            let channel = Channel::from_subscription(&raw.subscription).ok_or_else(|| {
                FeedError::Parse(format!("unknown subscription: {}", raw.subscription.kind))
            })?;
            Routed::SubscriptionAck {
                channel,
                subscribed: raw.method != "unsubscribe",
            }
        }
        "pong" => Routed::Pong,
        "error" => Routed::ServerError(value_text(&data)),
        _ => publish(
            Channel::Raw(channel.clone()),
            FeedEvent::Raw { channel, data },
        ),
    };

    Ok(routed)
}

fn publish(channel: Channel, event: FeedEvent) -> Routed {
    Routed::Publish(vec![(channel, event)])
}

fn decode<T: DeserializeOwned>(data: Value) -> FeedResult<T> {
    serde_json::from_value(data).map_err(FeedError::from)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn millis(field: &str, ms: i64) -> FeedResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| FeedError::Parse(format!("{}: invalid timestamp {}", field, ms)))
}

fn side(code: &str) -> FeedResult<Side> {
    Side::from_wire(code).ok_or_else(|| FeedError::Parse(format!("unknown side: {}", code)))
}

fn address(value: &str) -> FeedResult<Address> {
    Address::parse(value).map_err(|e| FeedError::Parse(e.to_string()))
}

fn levels(raw: &[RawLevel]) -> FeedResult<Vec<BookLevel>> {
    raw.iter()
        .map(|l| Ok(BookLevel::new(decimal("px", &l.px)?, decimal("sz", &l.sz)?, l.n)))
        .collect()
}

fn order_book(raw: RawBook) -> FeedResult<OrderBook> {
    let [bids, asks] = raw.levels.as_slice() else {
        return Err(FeedError::Parse(format!(
            "l2Book {}: expected 2 sides, got {}",
            raw.coin,
            raw.levels.len()
        )));
    };
    Ok(OrderBook::new(
        raw.coin.clone(),
        levels(bids)?,
        levels(asks)?,
        millis("time", raw.time)?,
    ))
}

fn trade(raw: &RawTrade) -> FeedResult<Trade> {
    Ok(Trade {
        coin: raw.coin.clone(),
        side: side(&raw.side)?,
        price: decimal("px", &raw.px)?,
        size: decimal("sz", &raw.sz)?,
        timestamp: millis("time", raw.time)?,
        tid: raw.tid,
        hash: raw.hash.clone(),
    })
}

fn candle(raw: RawCandle) -> FeedResult<Candle> {
    let interval: CandleInterval = raw
        .i
        .parse()
        .map_err(|e: perp_core::CoreError| FeedError::Parse(e.to_string()))?;
    Ok(Candle {
        coin: raw.s,
        interval,
        open_time: millis("t", raw.t)?,
        close_time: millis("T", raw.close_time)?,
        open: decimal("o", &raw.o)?,
        high: decimal("h", &raw.h)?,
        low: decimal("l", &raw.l)?,
        close: decimal("c", &raw.c)?,
        volume: decimal("v", &raw.v)?,
        trades: raw.n,
    })
}

fn open_order(raw: &RawOrder) -> FeedResult<OpenOrder> {
    Ok(OpenOrder {
        oid: raw.oid,
        coin: raw.coin.clone(),
        side: side(&raw.side)?,
        limit_price: decimal("limitPx", &raw.limit_px)?,
        size: decimal("sz", &raw.sz)?,
        orig_size: parse_decimal_opt(raw.orig_sz.as_deref()),
        timestamp: millis("timestamp", raw.timestamp)?,
    })
}

fn web_data(raw: RawWebData2) -> FeedResult<Routed> {
    let user = address(&raw.user)?;

    let (margin, positions) = match &raw.clearinghouse_state {
        Some(state) => {
            let summary = &state.margin_summary;
            let margin = MarginSummary {
                account_value: decimal("accountValue", &summary.account_value)?,
                total_notional_position: decimal("totalNtlPos", &summary.total_ntl_pos)?,
                total_margin_used: decimal("totalMarginUsed", &summary.total_margin_used)?,
                withdrawable: parse_decimal_opt(state.withdrawable.as_deref())
                    .unwrap_or(Decimal::ZERO),
            };
            let positions = state
                .asset_positions
                .iter()
                .map(|ap| {
                    let p = &ap.position;
                    Ok(PositionSummary {
                        coin: p.coin.clone(),
                        size: decimal("szi", &p.szi)?,
                        entry_price: parse_decimal_opt(p.entry_px.as_deref()),
                        liquidation_price: parse_decimal_opt(p.liquidation_px.as_deref()),
                        unrealized_pnl: decimal("unrealizedPnl", &p.unrealized_pnl)?,
                        leverage: p.leverage.as_ref().map(|l| l.value),
                        position_value: decimal("positionValue", &p.position_value)?,
                    })
                })
                .collect::<FeedResult<Vec<_>>>()?;
            (margin, positions)
        }
        None => (MarginSummary::default(), Vec::new()),
    };

    let account = AccountSnapshot {
        user: user.clone(),
        margin,
        positions,
        open_orders: raw.open_orders.iter().map(open_order).collect::<FeedResult<_>>()?,
        server_time: raw.server_time.map(|t| millis("serverTime", t)).transpose()?,
    };

    let mut events = vec![(Channel::account(user), FeedEvent::Account(account))];

    // 계정 피드에 메타데이터가 실려 오면 부트스트랩과 같은 경로로 처리
    if let (Some(meta), Some(ctxs)) = (&raw.meta, &raw.asset_ctxs) {
        let snapshot = build_snapshot(meta, ctxs, SnapshotSource::AccountFeed)?;
        events.push((Channel::Metadata, FeedEvent::Metadata(Arc::new(snapshot))));
    }

    Ok(Routed::Publish(events))
}

fn historical_orders(raw: RawHistoricalOrders) -> FeedResult<HistoricalOrders> {
    let orders = raw
        .order_history
        .iter()
        .map(|entry| {
            let order = open_order(&entry.order)?;
            Ok(HistoricalOrder {
                oid: order.oid,
                coin: order.coin,
                side: order.side,
                limit_price: order.limit_price,
                size: order.size,
                orig_size: order.orig_size,
                status: entry.status.clone(),
                status_time: millis("statusTimestamp", entry.status_timestamp)?,
            })
        })
        .collect::<FeedResult<Vec<_>>>()?;

    Ok(HistoricalOrders {
        user: address(&raw.user)?,
        is_snapshot: raw.is_snapshot,
        orders,
    })
}
