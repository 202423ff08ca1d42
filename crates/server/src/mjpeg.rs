use std::io::{self, Write};

use crossbeam_channel::Receiver;
use focusguard_core::shared::constants::MULTIPART_BOUNDARY;
use focusguard_core::shared::encoded_frame::EncodedFrame;

/// `Content-Type` of the video feed response.
pub fn stream_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={MULTIPART_BOUNDARY}")
}

/// Status line and headers of the video feed response.
///
/// The body has no length and is not chunked, so the connection is marked
/// for close and the stream ends when the socket does.
pub fn stream_head(allow_origin: Option<&str>) -> String {
    let mut head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n",
        stream_content_type()
    );
    if let Some(origin) = allow_origin {
        head.push_str(&format!(
            "Access-Control-Allow-Origin: {origin}\r\nVary: Origin\r\n"
        ));
    }
    head.push_str("\r\n");
    head
}

/// Frames one encoded image as a multipart part.
pub fn multipart_part(frame: &EncodedFrame) -> Vec<u8> {
    let head = format!(
        "--{MULTIPART_BOUNDARY}\r\nContent-Type: {}\r\n\r\n",
        frame.content_type()
    );
    let mut part = Vec::with_capacity(head.len() + frame.len() + 2);
    part.extend_from_slice(head.as_bytes());
    part.extend_from_slice(frame.bytes());
    part.extend_from_slice(b"\r\n");
    part
}

/// Writes every frame of a subscription as its own flushed part.
///
/// Returns the number of parts written once the broadcaster closes. The
/// first write error, typically a client that went away, ends the relay
/// and drops the subscription with it.
pub fn relay(frames: Receiver<EncodedFrame>, out: &mut dyn Write) -> io::Result<usize> {
    let mut written = 0;
    for frame in frames {
        out.write_all(&multipart_part(&frame))?;
        out.flush()?;
        written += 1;
    }
    Ok(written)
}
