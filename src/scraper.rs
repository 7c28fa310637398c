//! Retailer product search.
//!
//! Each strategy answers `search(query, limit)`; [`FallbackSearch`] tries
//! them in configured order and returns the first non-empty result.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScraperConfig;
use crate::error::{Result, StylistError};
use crate::models::Product;

const HM_RETAILER: &str = "H&M";
const HM_PRODUCT_URL: &str = "https://www2.hm.com/en_us/productpage";

#[async_trait]
pub trait ProductSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>>;
}

fn hm_product_url(code: &str) -> String {
    format!("{HM_PRODUCT_URL}.{code}.html")
}

fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// H&M public search API
pub struct HmApiSearch {
    client: Client,
    url: String,
}

impl HmApiSearch {
    pub fn new(url: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            url,
        })
    }
}

/// Products from an API payload. Items without a code or name are skipped.
pub fn parse_api_results(data: &Value, limit: usize) -> Vec<Product> {
    let Some(articles) = data.get("results").and_then(Value::as_array) else {
        tracing::warn!("Unexpected H&M API format: no results array");
        return Vec::new();
    };

    articles
        .iter()
        .filter_map(|item| {
            let code = item.get("code").and_then(Value::as_str)?;
            let name = item.get("name").and_then(Value::as_str)?;
            let price = item
                .get("whitePrice")
                .and_then(|p| p.get("formattedValue"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let image = item
                .get("images")
                .and_then(Value::as_array)
                .and_then(|imgs| imgs.first())
                .and_then(|img| img.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some(Product {
                name: name.to_string(),
                price,
                url: hm_product_url(code),
                image,
                retailer: HM_RETAILER.to_string(),
            })
        })
        .take(limit)
        .collect()
}

#[async_trait]
impl ProductSearch for HmApiSearch {
    fn name(&self) -> &str {
        "api"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        tracing::info!(query, limit, "Calling H&M API");
        let page_size = limit.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query), ("page-size", page_size.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StylistError::provider(
                "hm-api",
                format!("HTTP {}", response.status()),
            ));
        }

        let data: Value = response.json().await?;
        Ok(parse_api_results(&data, limit))
    }
}

/// H&M search results page, read from its embedded `__NEXT_DATA__` JSON
pub struct HmPageSearch {
    client: Client,
    url: String,
}

impl HmPageSearch {
    pub fn new(url: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            url,
        })
    }
}

/// The JSON payload of `<script id="__NEXT_DATA__">`, if present.
pub fn extract_embedded_json(html: &str) -> Option<Value> {
    let marker = html.find("id=\"__NEXT_DATA__\"")?;
    let rest = &html[marker..];
    let start = rest.find('>')? + 1;
    let end = rest[start..].find("</script>")? + start;
    serde_json::from_str(rest[start..end].trim()).ok()
}

fn first_str<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn product_from_page_item(obj: &serde_json::Map<String, Value>) -> Option<(String, Product)> {
    let code = first_str(obj, &["articleCode", "code"])?;
    let name = first_str(obj, &["productName", "title", "name"])?;
    let price = first_str(obj, &["formattedPrice", "price"])
        .map(str::to_string)
        .or_else(|| {
            obj.get("prices")
                .and_then(Value::as_array)
                .and_then(|p| p.first())
                .and_then(|p| p.get("formattedPrice"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    let image = first_str(obj, &["imageProductSrc", "image", "imageUrl"]).map(str::to_string);
    Some((
        code.to_string(),
        Product {
            name: name.to_string(),
            price,
            url: hm_product_url(code),
            image,
            retailer: HM_RETAILER.to_string(),
        },
    ))
}

/// Walk the page data depth-first collecting product-shaped objects.
pub fn parse_page_products(data: &Value, limit: usize) -> Vec<Product> {
    let mut products = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![data];

    while let Some(node) = stack.pop() {
        if products.len() >= limit {
            break;
        }
        match node {
            Value::Object(obj) => {
                if let Some((code, product)) = product_from_page_item(obj) {
                    if seen.insert(code) {
                        products.push(product);
                    }
                    continue;
                }
                // Reverse so document order is preserved when popping.
                stack.extend(obj.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    products
}

#[async_trait]
impl ProductSearch for HmPageSearch {
    fn name(&self) -> &str {
        "page"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        tracing::info!(query, limit, "Fetching H&M search page");
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StylistError::provider(
                "hm-page",
                format!("HTTP {}", response.status()),
            ));
        }

        let html = response.text().await?;
        let data = extract_embedded_json(&html)
            .ok_or_else(|| StylistError::decode("H&M page", "no __NEXT_DATA__ payload"))?;
        Ok(parse_page_products(&data, limit))
    }
}

/// Ordered chain of strategies; the first non-empty answer wins.
pub struct FallbackSearch {
    strategies: Vec<Arc<dyn ProductSearch>>,
}

impl FallbackSearch {
    pub fn new(strategies: Vec<Arc<dyn ProductSearch>>) -> Self {
        Self { strategies }
    }

    pub fn from_config(cfg: &ScraperConfig, timeout: Duration) -> Result<Self> {
        let mut strategies: Vec<Arc<dyn ProductSearch>> = Vec::new();
        for name in &cfg.strategies {
            match name.as_str() {
                "api" => strategies.push(Arc::new(HmApiSearch::new(
                    cfg.api_url.clone(),
                    &cfg.user_agent,
                    timeout,
                )?)),
                "page" => strategies.push(Arc::new(HmPageSearch::new(
                    cfg.page_url.clone(),
                    &cfg.user_agent,
                    timeout,
                )?)),
                other => tracing::warn!("Unknown scraper strategy '{}', skipping", other),
            }
        }
        Ok(Self::new(strategies))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl ProductSearch for FallbackSearch {
    fn name(&self) -> &str {
        "chain"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        for strategy in &self.strategies {
            match strategy.search(query, limit).await {
                Ok(products) if !products.is_empty() => {
                    tracing::info!(strategy = strategy.name(), count = products.len(), "Products found");
                    return Ok(products);
                }
                Ok(_) => {
                    tracing::info!(strategy = strategy.name(), "No products, trying next strategy");
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), "Product search failed: {}", e);
                }
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSearch {
        name: &'static str,
        result: fn() -> Result<Vec<Product>>,
        calls: AtomicUsize,
    }

    impl StubSearch {
        fn new(name: &'static str, result: fn() -> Result<Vec<Product>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ProductSearch for StubSearch {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn tee() -> Product {
        Product {
            name: "Regular Fit T-shirt".to_string(),
            price: Some("$9.99".to_string()),
            url: hm_product_url("0685816002"),
            image: None,
            retailer: HM_RETAILER.to_string(),
        }
    }

    #[test]
    fn test_parse_api_results() {
        let data = json!({
            "results": [
                {
                    "code": "0685816002",
                    "name": "Regular Fit T-shirt",
                    "whitePrice": {"formattedValue": "$9.99"},
                    "images": [{"url": "https://image.hm.com/a.jpg"}]
                },
                {"name": "No code, skipped"},
                {"code": "0970819001", "name": "Loose Fit Tee", "images": []}
            ]
        });
        let products = parse_api_results(&data, 5);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price.as_deref(), Some("$9.99"));
        assert_eq!(products[0].image.as_deref(), Some("https://image.hm.com/a.jpg"));
        assert_eq!(
            products[0].url,
            "https://www2.hm.com/en_us/productpage.0685816002.html"
        );
        assert_eq!(products[1].price, None);
        assert_eq!(products[1].retailer, "H&M");

        assert_eq!(parse_api_results(&data, 1).len(), 1);
        assert!(parse_api_results(&json!({"error": "nope"}), 5).is_empty());
    }

    #[test]
    fn test_extract_embedded_json() {
        let html = r#"<html><head></head><body><div id="app"></div>
<script id="__NEXT_DATA__" type="application/json">{"props": {"pageProps": {"ok": true}}}</script>
</body></html>"#;
        let data = extract_embedded_json(html).unwrap();
        assert_eq!(data["props"]["pageProps"]["ok"], json!(true));

        assert!(extract_embedded_json("<html>no data</html>").is_none());
        assert!(extract_embedded_json(r#"<script id="__NEXT_DATA__">{broken</script>"#).is_none());
    }

    #[test]
    fn test_parse_page_products_dedups_and_limits() {
        let data = json!({
            "props": {"pageProps": {"srpProps": {"hits": [
                {"articleCode": "111", "productName": "Oxford Shirt", "prices": [{"formattedPrice": "$24.99"}], "imageProductSrc": "https://img/1.jpg"},
                {"articleCode": "111", "productName": "Oxford Shirt"},
                {"articleCode": "222", "title": "Slim Chinos", "price": "$29.99"},
                {"articleCode": "333", "productName": "Linen Shirt"}
            ]}}}
        });
        let products = parse_page_products(&data, 2);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Oxford Shirt");
        assert_eq!(products[0].price.as_deref(), Some("$24.99"));
        assert_eq!(products[0].image.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(products[1].name, "Slim Chinos");
        assert_eq!(products[1].price.as_deref(), Some("$29.99"));
    }

    #[tokio::test]
    async fn test_chain_falls_through_errors_and_empty_results() {
        let failing = StubSearch::new("api", || {
            Err(StylistError::provider("hm-api", "HTTP 403"))
        });
        let empty = StubSearch::new("page", || Ok(Vec::new()));
        let good = StubSearch::new("third", || Ok(vec![tee()]));
        let unused = StubSearch::new("fourth", || Ok(vec![tee(), tee()]));

        let strategies: Vec<Arc<dyn ProductSearch>> =
            vec![failing.clone(), empty.clone(), good.clone(), unused.clone()];
        let chain = FallbackSearch::new(strategies);
        let products = chain.search("white t-shirt", 5).await.unwrap();
        assert_eq!(products, vec![tee()]);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chain_all_failing_is_empty() {
        let strategies: Vec<Arc<dyn ProductSearch>> = vec![StubSearch::new("api", || {
            Err(StylistError::provider("hm-api", "HTTP 500"))
        })];
        let chain = FallbackSearch::new(strategies);
        assert!(chain.search("jeans", 3).await.unwrap().is_empty());
    }

    #[test]
    fn test_from_config_skips_unknown_strategies() {
        let cfg = ScraperConfig {
            strategies: vec!["page".to_string(), "browser".to_string(), "api".to_string()],
            ..ScraperConfig::default()
        };
        let chain = FallbackSearch::from_config(&cfg, Duration::from_secs(5)).unwrap();
        assert_eq!(chain.strategy_names(), vec!["page", "api"]);
    }
}
