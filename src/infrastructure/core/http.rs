use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

/// Builds the shared HTTP client: pooled connections, a 30s request
/// timeout, and exponential-backoff retries for transient transport
/// failures. Status-code handling (402, 429) happens in the upstream
/// clients, above the retry layer.
pub fn build_http_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    let client = Client::builder()
        .pool_max_idle_per_host(5)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new());

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// Appends query parameters to a URL. The middleware client does not
/// expose `.query()`, so the string is assembled by hand.
pub fn url_with_query<K, V>(base: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base.to_string();
    }

    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect();

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}", base, separator, query.join("&"))
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_query() {
        assert_eq!(url_with_query::<&str, &str>("http://x/y", &[]), "http://x/y");
        assert_eq!(
            url_with_query("http://x/y", &[("a", "1"), ("b", "two words")]),
            "http://x/y?a=1&b=two%20words"
        );
        assert_eq!(
            url_with_query("http://x/y?a=1", &[("b", "2")]),
            "http://x/y?a=1&b=2"
        );
    }

    #[test]
    fn test_percent_encode_non_ascii() {
        assert_eq!(percent_encode("btc/usd"), "btc%2Fusd");
        assert_eq!(percent_encode("safe-._~"), "safe-._~");
    }
}
