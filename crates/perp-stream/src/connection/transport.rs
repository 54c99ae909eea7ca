//! WebSocket 전송 계층.
//!
//! 허브는 소켓을 직접 다루지 않고 [`Transport`]의 채널 쌍만 사용합니다.
//! [`TungsteniteConnector`]는 실제 소켓을 열고 읽기/쓰기 펌프 태스크를 띄우며,
//! 테스트는 메모리 내 [`Connector`] 구현을 주입합니다.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{debug, info, trace, warn};

use crate::error::{FeedError, FeedResult};

/// 정상 종료 코드.
pub const NORMAL_CLOSURE: u16 = 1000;

/// 소켓으로 보낼 프레임.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// 소켓에서 올라온 이벤트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    /// 종료 프레임 수신 또는 스트림 종료 (`code`는 종료 프레임이 있을 때만)
    Closed { code: Option<u16>, reason: String },
    Error(String),
}

impl TransportEvent {
    /// 정상 종료 코드로 닫혔는지 확인.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, TransportEvent::Closed { code: Some(NORMAL_CLOSURE), .. })
    }
}

/// 열린 연결의 채널 쌍.
#[derive(Debug)]
pub struct Transport {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// 연결 생성기.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> FeedResult<Transport>;
}

/// tokio-tungstenite 기반 커넥터.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> FeedResult<Transport> {
        let (ws, _) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                FeedError::Timeout(format!("connect {} after {:?}", url, self.connect_timeout))
            })?
            .map_err(|e| match e {
                WsError::Url(e) => FeedError::InvalidUrl(format!("{}: {}", url, e)),
                e => FeedError::ConnectionFailed(e.to_string()),
            })?;

        info!(url, "WebSocket 연결됨");

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<TransportEvent>();

        // 쓰기 펌프
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let (message, closing) = match frame {
                    OutboundFrame::Text(text) => (Message::Text(text), false),
                    OutboundFrame::Close { code, reason } => (
                        Message::Close(Some(CloseFrame {
                            code: CloseCode::from(code),
                            reason: Cow::Owned(reason),
                        })),
                        true,
                    ),
                };
                if let Err(e) = sink.send(message).await {
                    debug!(error = %e, "프레임 전송 실패, 쓰기 펌프 종료");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // 읽기 펌프
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let event = match message {
                    Ok(Message::Text(text)) => TransportEvent::Text(text),
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                            .unwrap_or((None, String::new()));
                        let _ = in_tx.send(TransportEvent::Closed { code, reason });
                        return;
                    }
                    Ok(Message::Binary(bytes)) => {
                        trace!(len = bytes.len(), "바이너리 프레임 무시");
                        continue;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "WebSocket 수신 오류");
                        let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                };
                if in_tx.send(event).is_err() {
                    return;
                }
            }
            let _ = in_tx.send(TransportEvent::Closed {
                code: None,
                reason: "stream ended".to_string(),
            });
        });

        Ok(Transport {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
