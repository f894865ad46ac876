//! Endpoint URL construction.

/// Collapse every run of slashes into one, except a run directly after `:`.
///
/// A run following `:` keeps two slashes so `scheme://` survives; anything
/// longer is still trimmed down to those two.
pub fn reduce_slashes(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut chars = url.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        if c != '/' {
            out.push(c);
            prev = Some(c);
            continue;
        }

        let mut run = 1;
        while chars.next_if_eq(&'/').is_some() {
            run += 1;
        }

        let keep = if prev == Some(':') { run.min(2) } else { 1 };
        out.extend(std::iter::repeat('/').take(keep));
        prev = Some('/');
    }

    out
}

/// Join the API host with an endpoint path. The result always ends in `/`.
pub fn build_url(host: &str, path: &str) -> String {
    reduce_slashes(&format!("{}/{}/", host, path))
}
