//! Hyperliquid 무기한 선물 실시간 시세 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # BTC 호가창 (유효숫자 4자리로 집계)
//! perp book BTC --sig-figs 4
//!
//! # ETH 체결을 30초 동안 출력
//! perp --duration 30 trades ETH
//!
//! # SOL 15분봉
//! perp candles SOL --interval 15m
//!
//! # 테스트넷 마켓 메타데이터
//! perp --testnet meta
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perp_cli::commands::meta::{dump_meta, MetaConfig};
use perp_cli::commands::render::OutputFormat;
use perp_cli::commands::watch::{watch, WatchConfig, WatchTarget};
use perp_core::{init_logging, Address, AppConfig, BookParams, CandleInterval, LogConfig, TESTNET_WS_URL};
use perp_stream::MarketHub;
use tracing::info;

#[derive(Parser)]
#[command(name = "perp")]
#[command(about = "Hyperliquid perpetuals market-data CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (TOML)
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    /// 테스트넷 사용
    #[arg(long, global = true)]
    testnet: bool,

    /// 실행 시간 (초). 지정하지 않으면 Ctrl-C까지
    #[arg(short, long, global = true)]
    duration: Option<u64>,

    /// 출력 형식 (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// 연결 상태 변경을 stderr로 출력
    #[arg(long, global = true)]
    status: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 호가창
    Book {
        /// 코인 (예: BTC)
        coin: String,

        /// 가격 유효숫자 (2~5)
        #[arg(long)]
        sig_figs: Option<u8>,

        /// 가수 (1, 2, 5). --sig-figs 5와 함께만 사용
        #[arg(long)]
        mantissa: Option<u8>,
    },

    /// 체결
    Trades {
        /// 코인
        coin: String,
    },

    /// 캔들
    Candles {
        /// 코인
        coin: String,

        /// 캔들 간격 (1m, 5m, 15m, 1h, 4h, 1d ...)
        #[arg(short, long, default_value = "1m")]
        interval: String,
    },

    /// 전체 코인 중간가
    Mids,

    /// 자산 컨텍스트 (마크 가격, 펀딩, 미결제약정)
    Ctx {
        /// 코인
        coin: String,
    },

    /// 계정 피드 (마진, 포지션, 미체결 주문)
    Account {
        /// 지갑 주소 (0x + 40자리 hex)
        address: String,
    },

    /// 마켓 메타데이터 덤프
    Meta {
        /// 특정 코인만 출력
        coin: Option<String>,

        /// 초기화 대기 시간 (초)
        #[arg(long, default_value = "15")]
        timeout: u64,
    },
}

impl Commands {
    fn into_target(self) -> Result<WatchTarget> {
        let target = match self {
            Commands::Book {
                coin,
                sig_figs,
                mantissa,
            } => {
                let params = match (sig_figs, mantissa) {
                    (None, None) => None,
                    (sig_figs, mantissa) => Some(BookParams::new(sig_figs, mantissa)?),
                };
                WatchTarget::Book {
                    coin: coin.to_uppercase(),
                    params,
                }
            }
            Commands::Trades { coin } => WatchTarget::Trades {
                coin: coin.to_uppercase(),
            },
            Commands::Candles { coin, interval } => WatchTarget::Candles {
                coin: coin.to_uppercase(),
                interval: interval.parse::<CandleInterval>()?,
            },
            Commands::Mids => WatchTarget::Mids,
            Commands::Ctx { coin } => WatchTarget::Context {
                coin: coin.to_uppercase(),
            },
            Commands::Account { address } => WatchTarget::Account {
                user: Address::parse(&address)?,
            },
            Commands::Meta { .. } => anyhow::bail!("meta is not a streaming command"),
        };
        Ok(target)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut app = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if cli.testnet {
        app.feed.ws_url = TESTNET_WS_URL.to_string();
    }

    init_logging(LogConfig::from_settings(&app.logging))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let format = OutputFormat::parse(&cli.format)?;
    let duration = cli.duration.map(Duration::from_secs);
    info!(url = %app.feed.ws_url, "perp 시작");

    let hub = MarketHub::new(app.feed);

    match cli.command {
        Commands::Meta { coin, timeout } => {
            let config = MetaConfig {
                coin: coin.map(|c| c.to_uppercase()),
                format,
                timeout: Duration::from_secs(timeout),
            };
            let count = dump_meta(&hub, config).await?;
            info!(markets = count, "메타데이터 출력 완료");
        }
        command => {
            let config = WatchConfig {
                target: command.into_target()?,
                duration,
                format,
                show_status: cli.status,
            };
            let count = watch(&hub, config).await?;
            info!(events = count, "구독 종료");
        }
    }

    Ok(())
}
