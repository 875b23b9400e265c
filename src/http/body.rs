//! Body and payload rendering (§4.5).

use crate::color::{self, BLUE};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::warn;

pub(crate) struct RenderedBody {
    pub text: String,
    pub has_body: bool,
}

fn is_text_content_type(content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or("").trim();
    ct.starts_with("text/") || ct == "application/json" || ct == "application/x-javascript"
}

fn is_printable_ascii(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| (32..=126).contains(&b))
}

fn decode_content_encoding(bytes: &[u8], encoding: &str) -> Option<Vec<u8>> {
    match encoding.trim() {
        "" => Some(bytes.to_vec()),
        "gzip" => {
            let mut out = Vec::new();
            match GzDecoder::new(bytes).read_to_end(&mut out) {
                Ok(_) => Some(out),
                Err(e) => {
                    warn!("failed to gunzip body: {e}");
                    None
                }
            }
        }
        other => {
            warn!("unsupported content-encoding {other:?}, rendering as binary");
            None
        }
    }
}

/// Renders a body per §4.5's text/binary classification, truncating at the
/// byte level (never inside a UTF-8 char boundary) before lossily converting
/// to a displayable string.
pub(crate) fn render(
    body: &[u8],
    content_type: Option<&str>,
    content_encoding: Option<&str>,
    color_enabled: bool,
    max_len: usize,
) -> RenderedBody {
    if body.is_empty() {
        return RenderedBody { text: String::new(), has_body: false };
    }

    let content_type = content_type.unwrap_or("");
    let declared_text = is_text_content_type(content_type);

    let decoded = match content_encoding {
        Some(enc) if declared_text => match decode_content_encoding(body, enc) {
            Some(d) => d,
            None => {
                return RenderedBody {
                    text: color::colorize(color_enabled, BLUE, &binary_label(content_type)),
                    has_body: true,
                };
            }
        },
        _ => body.to_vec(),
    };

    if decoded.is_empty() {
        return RenderedBody { text: String::new(), has_body: false };
    }

    let show_as_text = declared_text || is_printable_ascii(&decoded);
    if !show_as_text {
        return RenderedBody {
            text: color::colorize(color_enabled, BLUE, &binary_label(content_type)),
            has_body: true,
        };
    }

    let (truncated, snipped) = truncate_bytes(&decoded, max_len);
    let mut text = String::from_utf8_lossy(truncated).into_owned();
    if let Some(n) = snipped {
        text.push_str(&format!("... ({n} bytes snipped)"));
    }
    RenderedBody {
        text: color::colorize(color_enabled, BLUE, &text),
        has_body: true,
    }
}

fn binary_label(content_type: &str) -> String {
    if content_type.is_empty() {
        "<binary content>".to_string()
    } else {
        format!("<binary content of type {content_type}>")
    }
}

/// Splits `bytes` at `max_len`, backing off to the nearest UTF-8 char
/// boundary so the lossy conversion never panics mid-character.
fn truncate_bytes(bytes: &[u8], max_len: usize) -> (&[u8], Option<usize>) {
    if bytes.len() <= max_len {
        return (bytes, None);
    }
    let mut cut = max_len;
    while cut > 0 && (bytes[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    (&bytes[..cut], Some(bytes.len() - cut))
}
