/// Extracts the bare, lower-cased address out of a `From` or `To`
/// header value.
///
/// The last whitespace-separated token is taken and angle brackets
/// are stripped, so `Name <a@x.com>` gives `a@x.com`. When the
/// header lists several recipients, only the last one is kept.
pub fn normalize_addr(header: &str) -> String {
    header
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .replace(|c| c == '<' || c == '>', "")
        .to_lowercase()
}
