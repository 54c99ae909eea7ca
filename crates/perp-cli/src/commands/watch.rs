//! 실시간 채널 구독 후 이벤트를 출력합니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use perp_core::{Address, BookParams, CandleInterval};
use perp_stream::{Channel, FeedEvent, MarketHub};
use tracing::{info, warn};

use super::render::{render, OutputFormat};

/// 구독 대상.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    Book {
        coin: String,
        params: Option<BookParams>,
    },
    Trades {
        coin: String,
    },
    Candles {
        coin: String,
        interval: CandleInterval,
    },
    Mids,
    Context {
        coin: String,
    },
    Account {
        user: Address,
    },
}

impl WatchTarget {
    pub fn channel(&self) -> Channel {
        match self {
            WatchTarget::Book { coin, .. } => Channel::order_book(coin.as_str()),
            WatchTarget::Trades { coin } => Channel::trades(coin.as_str()),
            WatchTarget::Candles { coin, interval } => Channel::candle(coin.as_str(), *interval),
            WatchTarget::Mids => Channel::AllMids,
            WatchTarget::Context { coin } => Channel::asset_context(coin.as_str()),
            WatchTarget::Account { user } => Channel::account(user.clone()),
        }
    }

    fn params(&self) -> Option<BookParams> {
        match self {
            WatchTarget::Book { params, .. } => *params,
            _ => None,
        }
    }

    /// 이 대상을 위해 허브에 연결할 때 사용할 지갑 주소.
    pub fn session_user(&self) -> Option<Address> {
        match self {
            WatchTarget::Account { user } => Some(user.clone()),
            _ => None,
        }
    }
}

/// 구독 실행 설정.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub target: WatchTarget,
    /// 지정하면 이 시간 뒤 종료, 없으면 Ctrl-C까지
    pub duration: Option<Duration>,
    pub format: OutputFormat,
    /// 연결 상태 변경도 출력
    pub show_status: bool,
}

/// 채널을 구독하고 종료 조건까지 이벤트를 출력합니다. 출력한 이벤트 수를 반환합니다.
pub async fn watch(hub: &MarketHub, config: WatchConfig) -> Result<usize> {
    let printed = Arc::new(AtomicUsize::new(0));
    let format = config.format;

    if config.show_status {
        hub.subscribe(Channel::Connection, move |event: &FeedEvent| {
            if let Some(line) = render(event, format) {
                eprintln!("{}", line);
            }
        })?;
    }

    hub.connect(config.target.session_user())
        .await
        .context("failed to connect to the exchange")?;

    let channel = config.target.channel();
    let counter = Arc::clone(&printed);
    hub.subscribe_with_params(channel.clone(), config.target.params(), move |event: &FeedEvent| {
        if let Some(line) = render(event, format) {
            println!("{}", line);
            counter.fetch_add(1, Ordering::Relaxed);
        }
    })
    .with_context(|| format!("failed to subscribe to {}", channel))?;

    info!(%channel, "구독 시작");
    wait_for_exit(config.duration).await;

    hub.disconnect();
    Ok(printed.load(Ordering::Relaxed))
}

/// Ctrl-C 또는 지정 시간 경과까지 대기합니다.
pub async fn wait_for_exit(duration: Option<Duration>) {
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Ctrl-C 핸들러 등록 실패");
            }
            info!("Ctrl-C 수신, 종료");
        }
        _ = deadline => info!("실행 시간 만료, 종료"),
    }
}
