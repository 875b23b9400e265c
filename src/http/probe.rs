//! HTTP recognition (§4.4): is the first data this connection has seen the
//! start of an HTTP/1.x request?

/// Upper bound on how many bytes of inconclusive lead-in we'll scan before
/// giving up and calling a connection non-HTTP.
pub(crate) const PROBE_BOUND: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Http,
    NotHttp,
    /// Not enough bytes yet to decide either way.
    Undecided,
}

/// Scans for a space followed by `HTTP/d.d\r\n`, requiring at least three
/// printable-ASCII bytes (a method token) before the space.
pub(crate) fn probe(buf: &[u8]) -> Probe {
    for (i, &b) in buf.iter().enumerate() {
        if !b.is_ascii_graphic() && b != b' ' {
            return Probe::NotHttp;
        }
        if b != b' ' {
            continue;
        }
        if i < 3 {
            return Probe::NotHttp;
        }
        let rest = &buf[i + 1..];
        match matches_version_tag(rest) {
            Some(true) => return Probe::Http,
            Some(false) => return Probe::NotHttp,
            None => {
                if buf.len() >= PROBE_BOUND {
                    return Probe::NotHttp;
                }
                return Probe::Undecided;
            }
        }
    }
    if buf.len() >= PROBE_BOUND {
        Probe::NotHttp
    } else {
        Probe::Undecided
    }
}

/// `Some(true)` if `rest` starts with `HTTP/d.d\r\n`, `Some(false)` if it
/// definitely doesn't, `None` if there aren't enough bytes yet to tell.
fn matches_version_tag(rest: &[u8]) -> Option<bool> {
    const TAG: &[u8] = b"HTTP/";
    if rest.len() < TAG.len() {
        return if rest == &TAG[..rest.len()] { None } else { Some(false) };
    }
    if &rest[..TAG.len()] != TAG {
        return Some(false);
    }
    let rest = &rest[TAG.len()..];
    if rest.len() < 4 {
        return None;
    }
    let ok = rest[0].is_ascii_digit() && rest[1] == b'.' && rest[2].is_ascii_digit();
    if !ok {
        return Some(false);
    }
    if rest.len() < 6 {
        return None;
    }
    Some(&rest[3..5] == b"\r\n")
}
