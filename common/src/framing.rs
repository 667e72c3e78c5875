//! フレーミング
//!
//! ストリーム上のメッセージは 4 バイトのビッグエンディアン長プレフィックスと
//! 本体で構成されます。

use std::io::{self, Read, Write};

use crate::error::{CommonError, Result};

/// 長さプレフィックスのバイト数
pub const LEN_PREFIX: usize = 4;

/// デフォルトの最大フレームサイズ（64KiB）
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// フレームを書き込む
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| CommonError::FrameTooLarge {
        size: payload.len(),
        limit: u32::MAX as usize,
    })?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;

    Ok(())
}

/// フレームを一つ読み込む（ブロッキング）
pub fn read_frame<R: Read>(reader: &mut R, max_size: usize) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; LEN_PREFIX];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > max_size {
        return Err(CommonError::FrameTooLarge {
            size: len,
            limit: max_size,
        });
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;

    Ok(buffer)
}

/// ノンブロッキング読み込み用のフレーム組み立て
///
/// 部分的に届いたバイト列を蓄積し、完成したフレームを取り出します。
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    max_size: usize,
}

impl FrameAssembler {
    /// 新しいフレーム組み立てを作成
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_size,
        }
    }

    /// 受信データを追加
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// 完成したフレームを一つ取り出す
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buffer.len() < LEN_PREFIX {
            return Ok(None);
        }

        let mut len_bytes = [0u8; LEN_PREFIX];
        len_bytes.copy_from_slice(&self.buffer[..LEN_PREFIX]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > self.max_size {
            return Err(CommonError::FrameTooLarge {
                size: len,
                limit: self.max_size,
            });
        }

        if self.buffer.len() < LEN_PREFIX + len {
            return Ok(None);
        }

        let frame = self.buffer[LEN_PREFIX..LEN_PREFIX + len].to_vec();
        self.buffer.drain(..LEN_PREFIX + len);
        Ok(Some(frame))
    }

    /// 蓄積中のバイト数
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// ストリームから読めるだけ読み込む
    ///
    /// 読み込みごとに完成したフレームを `on_frame` に渡すため、
    /// 蓄積は未完成のフレーム一つ分を超えません。
    /// 接続が閉じられた場合は `Ok(false)` を返します。
    pub fn fill_from<R, F>(&mut self, reader: &mut R, mut on_frame: F) -> Result<bool>
    where
        R: Read,
        F: FnMut(Vec<u8>),
    {
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.push(&chunk[..n]);
                    while let Some(frame) = self.next_frame()? {
                        on_frame(frame);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
