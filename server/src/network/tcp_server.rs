//! TCP トランスポート実装
//!
//! ノンブロッキングの TCP リスナーでコントローラーを一つずつ受け付け、
//! 長さプレフィックス付きのフレームとしてアクションメッセージを受信します。
//! 受信済みでまだ取り出されていないフレームは容量付きキューに置き、
//! あふれた分は [`OverflowPolicy`] に従って捨てます。

use super::queue::{ActionQueue, OverflowPolicy};
use super::{NetworkError, Transport};
use remote_input_rs_common::framing::FrameAssembler;
use remote_input_rs_common::CommonError;

use log::{debug, info, warn};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};

/// 接続中のコントローラー
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    assembler: FrameAssembler,
    /// 相手が送信を終えた
    closed: bool,
}

/// 受信済みフレームの既定の保持数
pub const DEFAULT_BACKLOG: usize = 64;

/// TCP トランスポート
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_frame_size: usize,
    connection: Option<Connection>,
    /// 受信済みで未取り出しのフレーム
    inbox: ActionQueue,
}

impl TcpTransport {
    /// 指定アドレスにバインド
    ///
    /// 失敗した場合はバインド先を含むエラーを返します。
    pub fn bind(addr: &str, max_frame_size: usize) -> Result<Self, NetworkError> {
        let bind_error = |source: io::Error| NetworkError::Bind {
            addr: addr.to_string(),
            source,
        };

        let listener = TcpListener::bind(addr).map_err(bind_error)?;
        // 非ブロッキングモードに設定
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        info!("TCPトランスポート待ち受け開始: {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            max_frame_size,
            connection: None,
            inbox: ActionQueue::new(DEFAULT_BACKLOG, OverflowPolicy::default()),
        })
    }

    /// 受信済みフレームの保持数とあふれたときの動作を設定
    pub fn with_backlog(mut self, capacity: usize, overflow: OverflowPolicy) -> Self {
        self.inbox = ActionQueue::new(capacity, overflow);
        self
    }

    /// あふれて捨てたフレーム数
    pub fn dropped(&self) -> u64 {
        self.inbox.dropped()
    }

    /// 待ち受けアドレス
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// コントローラーが接続中かどうか
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// 接続中のコントローラーのアドレス
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().map(|conn| conn.peer)
    }

    /// 保留中の接続要求を受け付ける
    fn accept_pending(&mut self) -> Result<(), NetworkError> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(true)?;
                // TCP_NODELAY設定
                let _ = stream.set_nodelay(true);
                info!("コントローラー接続: {}", peer);
                self.connection = Some(Connection {
                    stream,
                    peer,
                    assembler: FrameAssembler::new(self.max_frame_size),
                    closed: false,
                });
                Ok(())
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn disconnect(&mut self, reason: &str) {
        if let Some(conn) = self.connection.take() {
            info!("コントローラー切断: {} ({})", conn.peer, reason);
            let _ = conn.stream.shutdown(std::net::Shutdown::Both);
        }
    }
}

impl Transport for TcpTransport {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, NetworkError> {
        if self.connection.is_none() {
            self.accept_pending()?;
        }

        let inbox = &self.inbox;
        if let Some(conn) = self.connection.as_mut().filter(|conn| !conn.closed) {
            let dropped_before = inbox.dropped();
            let filled = conn.assembler.fill_from(&mut conn.stream, |frame| {
                inbox.push(frame);
            });
            let dropped = inbox.dropped() - dropped_before;
            if dropped > 0 {
                debug!("受信済みフレームがあふれたため {} 件破棄しました", dropped);
            }

            match filled {
                Ok(open) => conn.closed = !open,
                Err(CommonError::FrameTooLarge { size, limit }) => {
                    self.disconnect("フレームが大きすぎます");
                    return Err(NetworkError::FrameTooLarge { size, limit });
                }
                Err(e) => {
                    warn!("受信エラー: {}: {}", conn.peer, e);
                    self.disconnect("受信エラー");
                    return Ok(None);
                }
            }
        }

        if let Some(frame) = self.inbox.pop() {
            debug!("フレーム受信: {} バイト", frame.len());
            return Ok(Some(frame));
        }

        if let Some(conn) = self.connection.as_ref().filter(|conn| conn.closed) {
            if conn.assembler.pending() > 0 {
                warn!("未完成のフレームを破棄します: {} バイト", conn.assembler.pending());
            }
            self.disconnect("接続が閉じられました");
        }
        Ok(None)
    }
}
