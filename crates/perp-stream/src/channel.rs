//! 논리 구독 채널 식별자.
//!
//! 채널은 채널 종류와 식별자(코인, 간격, 사용자 주소)를 타입으로 가진 열거형입니다.
//! 호가 집계 파라미터는 채널 키에 포함되지 않고 구독 레코드에 저장됩니다.

use std::fmt;

use perp_core::{Address, BookParams, CandleInterval, Coin};

use crate::wire::SubscriptionPayload;

/// 구독 채널.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 코인별 호가창 (`l2Book`)
    OrderBook { coin: Coin },
    /// 코인별 체결 (`trades`)
    Trades { coin: Coin },
    /// 코인별 자산 컨텍스트 (`activeAssetCtx`)
    AssetContext { coin: Coin },
    /// 코인/간격별 캔들 (`candle`)
    Candle { coin: Coin, interval: CandleInterval },
    /// 전체 중간가 (`allMids`)
    AllMids,
    /// 사용자 계정 피드 (`webData2`)
    Account { user: Address },
    /// 사용자 과거 주문 피드 (`userHistoricalOrders`)
    HistoricalOrders { user: Address },
    /// 마켓 메타데이터 스냅샷 (로컬 전용)
    Metadata,
    /// 연결 상태 변경 (로컬 전용)
    Connection,
    /// 알 수 없는 인바운드 채널
    Raw(String),
}

impl Channel {
    pub fn order_book(coin: impl Into<Coin>) -> Self {
        Channel::OrderBook { coin: coin.into() }
    }

    pub fn trades(coin: impl Into<Coin>) -> Self {
        Channel::Trades { coin: coin.into() }
    }

    pub fn asset_context(coin: impl Into<Coin>) -> Self {
        Channel::AssetContext { coin: coin.into() }
    }

    pub fn candle(coin: impl Into<Coin>, interval: CandleInterval) -> Self {
        Channel::Candle {
            coin: coin.into(),
            interval,
        }
    }

    pub fn account(user: Address) -> Self {
        Channel::Account { user }
    }

    pub fn historical_orders(user: Address) -> Self {
        Channel::HistoricalOrders { user }
    }

    /// 와이어 구독 타입 이름. 로컬 전용 채널은 `None`.
    pub fn wire_type(&self) -> Option<&'static str> {
        match self {
            Channel::OrderBook { .. } => Some("l2Book"),
            Channel::Trades { .. } => Some("trades"),
            Channel::AssetContext { .. } => Some("activeAssetCtx"),
            Channel::Candle { .. } => Some("candle"),
            Channel::AllMids => Some("allMids"),
            Channel::Account { .. } => Some("webData2"),
            Channel::HistoricalOrders { .. } => Some("userHistoricalOrders"),
            Channel::Metadata | Channel::Connection | Channel::Raw(_) => None,
        }
    }

    /// 거래소에 구독 메시지를 보내는 채널인지 확인합니다.
    pub fn is_wire(&self) -> bool {
        self.wire_type().is_some()
    }

    /// 호가 집계 파라미터를 받는 채널인지 확인합니다.
    pub fn supports_params(&self) -> bool {
        matches!(self, Channel::OrderBook { .. })
    }

    /// 채널의 코인 식별자.
    pub fn coin(&self) -> Option<&str> {
        match self {
            Channel::OrderBook { coin }
            | Channel::Trades { coin }
            | Channel::AssetContext { coin }
            | Channel::Candle { coin, .. } => Some(coin),
            _ => None,
        }
    }

    /// 채널의 사용자 주소.
    pub fn user(&self) -> Option<&Address> {
        match self {
            Channel::Account { user } | Channel::HistoricalOrders { user } => Some(user),
            _ => None,
        }
    }

    /// 와이어 구독 페이로드로 변환합니다.
    ///
    /// `params`는 호가창 채널에서만 사용되고, 전체 정밀도면 생략됩니다.
    pub fn to_subscription(&self, params: Option<BookParams>) -> Option<SubscriptionPayload> {
        let mut payload = SubscriptionPayload::new(self.wire_type()?);
        match self {
            Channel::OrderBook { coin } => {
                payload.coin = Some(coin.clone());
                if let Some(p) = params {
                    payload.n_sig_figs = p.n_sig_figs;
                    payload.mantissa = p.mantissa;
                }
            }
            Channel::Trades { coin } | Channel::AssetContext { coin } => {
                payload.coin = Some(coin.clone());
            }
            Channel::Candle { coin, interval } => {
                payload.coin = Some(coin.clone());
                payload.interval = Some(interval.as_str().to_string());
            }
            Channel::Account { user } | Channel::HistoricalOrders { user } => {
                payload.user = Some(user.as_str().to_string());
            }
            _ => {}
        }
        Some(payload)
    }

    /// 구독 확인 메시지의 페이로드에서 채널을 복원합니다.
    pub fn from_subscription(payload: &SubscriptionPayload) -> Option<Self> {
        let coin = || payload.coin.clone();
        let user = || payload.user.as_deref().and_then(|u| Address::parse(u).ok());

        match payload.kind.as_str() {
            "l2Book" => coin().map(Channel::order_book),
            "trades" => coin().map(Channel::trades),
            "activeAssetCtx" => coin().map(Channel::asset_context),
            "candle" => {
                let interval = payload.interval.as_deref()?.parse().ok()?;
                coin().map(|c| Channel::candle(c, interval))
            }
            "allMids" => Some(Channel::AllMids),
            "webData2" => user().map(Channel::account),
            "userHistoricalOrders" => user().map(Channel::historical_orders),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::OrderBook { coin } => write!(f, "l2Book:{}", coin),
            Channel::Trades { coin } => write!(f, "trades:{}", coin),
            Channel::AssetContext { coin } => write!(f, "activeAssetCtx:{}", coin),
            Channel::Candle { coin, interval } => write!(f, "candle:{}:{}", coin, interval),
            Channel::AllMids => write!(f, "allMids"),
            Channel::Account { user } => write!(f, "webData2:{}", user.short()),
            Channel::HistoricalOrders { user } => {
                write!(f, "userHistoricalOrders:{}", user.short())
            }
            Channel::Metadata => write!(f, "metadata"),
            Channel::Connection => write!(f, "connection"),
            Channel::Raw(name) => write!(f, "raw:{}", name),
        }
    }
}
