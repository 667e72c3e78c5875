//! リモート入力コントローラーライブラリ
//!
//! エンジンへアクションメッセージを送るコントローラーを提供します。

pub mod config;
pub mod input;
pub mod network;

pub use config::ControllerSettings;
pub use input::{ActionBuilder, ActionSource, RandomPolicy};
pub use network::{ControllerConnection, NetworkError};

use remote_input_rs_common::utils::time::FramePacer;

/// 供給元のアクションを一定間隔で送信
///
/// `count` が `None` の場合は送信に失敗するまで続けます。送信数を返します。
pub fn drive<S: ActionSource + ?Sized>(
    conn: &mut ControllerConnection,
    source: &mut S,
    rate: u32,
    count: Option<u64>,
) -> Result<u64, NetworkError> {
    let mut pacer = FramePacer::from_rate(rate);
    let mut sent = 0u64;

    while count.map_or(true, |limit| sent < limit) {
        let action = source.next_action();
        conn.send_action(&action)?;
        sent += 1;
        pacer.wait();
    }

    log::info!("{} 件のアクションを送信しました", sent);
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_input_rs_common::framing::{read_frame, DEFAULT_MAX_FRAME_SIZE};
    use remote_input_rs_common::keys::LogicalKey;
    use remote_input_rs_common::protocol::ActionDecoder;
    use remote_input_rs_common::WireFormat;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn test_drive_sends_count_actions() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut conn =
            ControllerConnection::connect(&addr, Duration::from_secs(1), WireFormat::Binary)
                .unwrap();
        let (mut server, _) = listener.accept().unwrap();

        let mut source = input::Repeat(ActionBuilder::new().press(LogicalKey::Forward).build());
        let sent = drive(&mut conn, &mut source, 1000, Some(3)).unwrap();
        assert_eq!(sent, 3);

        for _ in 0..3 {
            let frame = read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).unwrap();
            let action = WireFormat::Binary.decode(&frame).unwrap();
            assert_eq!(action.keys.len(), 1);
            assert_eq!(action.keys[0].name, "forward");
            assert!(action.keys[0].down);
        }
    }
}
