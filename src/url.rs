//! Splits a textual host and URL into Uri-Host / Uri-Path / Uri-Query
//! options for an outbound request, the way the Arduino original's
//! `Coap::send()` builds its option list by hand before `sendPacket()`.

use heapless::Vec as HVec;

use crate::option::{CoapOptionNumber, Opt};

/// Appends Uri-Host (from `host_text`), then one Uri-Path option per `/`
/// -delimited segment of `url`, then one Uri-Query option per `&`
/// -delimited segment following the first `?`. No percent-decoding is
/// performed -- segments are taken byte-for-byte, matching the original's
/// plain `memcpy` of substrings. A leading `/` produces no empty
/// leading Uri-Path segment, and a url with no `/` produces a single
/// Uri-Path option for the whole string.
pub fn split<'a, const N: usize>(
    host_text: &'a str,
    url: &'a str,
    out: &mut HVec<Opt<'a>, N>,
) -> bool {
    if out
        .push(Opt {
            number: u16::from(CoapOptionNumber::UriHost),
            value: host_text.as_bytes(),
        })
        .is_err()
    {
        return false;
    }

    split_path_query(url, out)
}

/// The Uri-Path/Uri-Query half of [`split`], factored out so callers that
/// need to interleave another option (e.g. Observe, which sorts between
/// Uri-Host and Uri-Path) between the host and the path can push it
/// themselves and then append the rest here.
pub fn split_path_query<'a, const N: usize>(url: &'a str, out: &mut HVec<Opt<'a>, N>) -> bool {
    let (path, _) = split_path_and_query_str(url);
    split_path(path, out) && split_query(url, out)
}

fn split_path_and_query_str(url: &str) -> (&str, Option<&str>) {
    match url.find('?') {
        Some(idx) => (&url[..idx], Some(&url[idx + 1..])),
        None => (url, None),
    }
}

/// Pushes one Uri-Path option per `/`-delimited segment of `path` (which
/// must already have any `?...` query suffix stripped).
pub fn split_path<'a, const N: usize>(path: &'a str, out: &mut HVec<Opt<'a>, N>) -> bool {
    let mut idx = 0;
    let bytes = path.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b'/' {
            if i > idx
                && out
                    .push(Opt {
                        number: u16::from(CoapOptionNumber::UriPath),
                        value: &path.as_bytes()[idx..i],
                    })
                    .is_err()
            {
                return false;
            }
            idx = i + 1;
        }
    }
    if idx < bytes.len()
        && out
            .push(Opt {
                number: u16::from(CoapOptionNumber::UriPath),
                value: &path.as_bytes()[idx..],
            })
            .is_err()
    {
        return false;
    }
    true
}

/// Pushes one Uri-Query option per `&`-delimited segment following the
/// first `?` in `url` (a no-op if `url` carries no `?`).
pub fn split_query<'a, const N: usize>(url: &'a str, out: &mut HVec<Opt<'a>, N>) -> bool {
    let (_, query) = split_path_and_query_str(url);
    let query = match query {
        Some(query) => query,
        None => return true,
    };
    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        if out
            .push(Opt {
                number: u16::from(CoapOptionNumber::UriQuery),
                value: segment.as_bytes(),
            })
            .is_err()
        {
            return false;
        }
    }
    true
}
