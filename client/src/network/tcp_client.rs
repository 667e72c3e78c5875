//! TCP クライアント実装
//!
//! 長さプレフィックス付きフレームでアクションをエンジンへ送ります。

use super::NetworkError;
use remote_input_rs_common::framing;
use remote_input_rs_common::protocol::{Action, WireFormat};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// コントローラー側の TCP 接続
pub struct ControllerConnection {
    /// TCP 接続
    stream: Option<TcpStream>,
    /// 接続先
    peer: SocketAddr,
    /// ワイヤ形式
    format: WireFormat,
    /// 送信済みフレーム数
    sent: u64,
}

impl ControllerConnection {
    /// 接続
    ///
    /// 名前解決で得られたアドレスを順に試し、最初に成功したものを使います。
    pub fn connect(addr: &str, timeout: Duration, format: WireFormat) -> Result<Self, NetworkError> {
        let connect_err = |source| NetworkError::Connect {
            addr: addr.to_string(),
            source,
        };

        let mut last_err = None;
        for target in addr.to_socket_addrs().map_err(connect_err)? {
            match TcpStream::connect_timeout(&target, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    log::info!("{} に接続しました（形式: {}）", target, format);
                    return Ok(Self {
                        stream: Some(stream),
                        peer: target,
                        format,
                        sent: 0,
                    });
                }
                Err(err) => {
                    log::debug!("{} への接続に失敗しました: {}", target, err);
                    last_err = Some(err);
                }
            }
        }

        Err(connect_err(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "アドレスが見つかりません")
        })))
    }

    /// 接続先
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// ワイヤ形式
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// 接続されているかどうか
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// 送信済みフレーム数
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// アクションを送信
    pub fn send_action(&mut self, action: &Action) -> Result<(), NetworkError> {
        let payload = self.format.encode(action)?;
        self.send_raw(&payload)
    }

    /// エンコード済みのペイロードをそのまま送信
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<(), NetworkError> {
        let stream = self.stream.as_mut().ok_or(NetworkError::NotConnected)?;
        if let Err(err) = framing::write_frame(stream, payload) {
            log::warn!("送信に失敗したため切断します: {}", err);
            self.stream = None;
            return Err(err.into());
        }
        self.sent += 1;
        log::trace!("フレームを送信しました（{} バイト）", payload.len());
        Ok(())
    }

    /// 切断
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            log::info!("{} から切断しました（送信 {} 件）", self.peer, self.sent);
        }
    }
}

impl Drop for ControllerConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_input_rs_common::framing::{read_frame, DEFAULT_MAX_FRAME_SIZE};
    use remote_input_rs_common::protocol::{AbsentKeyPolicy, ActionDecoder};
    use std::net::TcpListener;

    #[test]
    fn test_send_action_is_framed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut conn =
            ControllerConnection::connect(&addr, Duration::from_secs(1), WireFormat::Json).unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let action = Action::new(AbsentKeyPolicy::Released)
            .with_key("jump", true)
            .with_mouse(2, 3);
        conn.send_action(&action).unwrap();
        conn.send_raw(b"raw").unwrap();
        assert_eq!(conn.sent(), 2);

        let first = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).unwrap();
        let decoded = WireFormat::Json.decode(&first).unwrap();
        assert_eq!(decoded.mouse_delta(), (2, 3));
        assert!(decoded.keys.iter().any(|e| e.name == "jump" && e.down));

        let second = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(second, b"raw");
    }

    #[test]
    fn test_send_after_close_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut conn =
            ControllerConnection::connect(&addr, Duration::from_secs(1), WireFormat::Binary)
                .unwrap();
        conn.close();
        assert!(!conn.is_connected());
        assert!(matches!(
            conn.send_raw(b"x"),
            Err(NetworkError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_refused_names_target() {
        // 一度バインドして閉じたポートには誰も待ち受けていない
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        match ControllerConnection::connect(&addr, Duration::from_millis(200), WireFormat::Binary) {
            Err(err @ NetworkError::Connect { .. }) => {
                assert!(err.to_string().contains(&addr));
            }
            Err(other) => panic!("想定外のエラー: {}", other),
            Ok(_) => panic!("接続できてしまいました"),
        }
    }
}
