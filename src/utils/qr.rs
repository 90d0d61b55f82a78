// QR encoding treated as a black box: URL in, PNG bytes out.
// Medium error correction, 200x200 pixels.

use qrcode_generator::QrCodeEcc;
use std::io::Write;
use thiserror::Error;
use tokio::sync::mpsc;

pub const QR_IMAGE_SIZE: usize = 200;

#[derive(Error, Debug)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(String),
    #[error("QR pipe closed before encoding finished")]
    PipeClosed,
}

/// std::io::Write adapter that ships PNG chunks into a tokio channel so a
/// consumer can run concurrently with the (blocking) encoder.
struct ChannelWriter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx
            .blocking_send(buf.to_vec())
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "qr pipe closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Stream a medium-EC QR PNG for `url` into the returned receiver. The
/// encoder runs on the blocking pool; await the JoinHandle to observe its
/// outcome after the consumer has drained the channel.
pub fn encode_png_stream(
    url: String,
) -> (
    mpsc::Receiver<Vec<u8>>,
    tokio::task::JoinHandle<Result<(), QrError>>,
) {
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::task::spawn_blocking(move || {
        let mut writer = ChannelWriter { tx };
        qrcode_generator::to_png_to_writer(url.as_bytes(), QrCodeEcc::Medium, QR_IMAGE_SIZE, &mut writer)
            .map_err(|e| QrError::Encode(e.to_string()))
    });
    (rx, handle)
}

/// One-shot convenience used outside the upload pipe
pub fn encode_png(url: &str) -> Result<Vec<u8>, QrError> {
    qrcode_generator::to_png_to_vec(url.as_bytes(), QrCodeEcc::Medium, QR_IMAGE_SIZE)
        .map_err(|e| QrError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_png_signature() {
        let bytes = encode_png("https://app.promorelay.com/redeematpos/abc1234").unwrap();
        assert!(bytes.len() > 8);
        // PNG magic bytes
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[tokio::test]
    async fn stream_matches_one_shot_encoding() {
        let url = "https://app.promorelay.com/redeematpos/abc1234";
        let (mut rx, handle) = encode_png_stream(url.to_string());
        let mut streamed = Vec::new();
        while let Some(chunk) = rx.recv().await {
            streamed.extend_from_slice(&chunk);
        }
        handle.await.unwrap().unwrap();
        assert_eq!(streamed, encode_png(url).unwrap());
    }
}
