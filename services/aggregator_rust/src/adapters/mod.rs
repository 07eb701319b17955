//! HTTP source adapters and feed wiring.
//!
//! Every source is fetched as HTML, flattened to line-oriented text, and
//! handed to the core's extraction tiers. Brand feeds use the aggregate
//! board pages first, with the vendors' own pages as fallbacks. The
//! Bảo Tín Mạnh Hải page quotes VND per chỉ, so its source carries an
//! explicit x10 unit hint rather than relying on magnitude inference.

use crate::config::AggregatorConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use goldboard_core::extract::{source_timestamp, UnitHint};
use goldboard_core::reconcile::{ExtractionProfile, FieldProfile};
use goldboard_core::sources::{BrandFeed, FeedSource, FxFeed, SilverFeed, SourceAdapter, SourceYield};
use goldboard_core::types::Brand;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const BOARD_PAGES: [(Brand, &str); 8] = [
    (Brand::Sjc, "https://giavang.org/trong-nuoc/sjc/"),
    (Brand::Pnj, "https://giavang.org/trong-nuoc/pnj/"),
    (Brand::Doji, "https://giavang.org/trong-nuoc/doji/"),
    (Brand::Btmc, "https://giavang.org/trong-nuoc/bao-tin-minh-chau/"),
    (Brand::Btmh, "https://giavang.org/trong-nuoc/bao-tin-manh-hai/"),
    (Brand::PhuQuy, "https://giavang.org/trong-nuoc/phu-quy/"),
    (Brand::MiHong, "https://giavang.org/trong-nuoc/mi-hong/"),
    (Brand::NgocTham, "https://giavang.org/trong-nuoc/ngoc-tham/"),
];

const FX_PAGE: &str = "https://webgia.com/ty-gia/vietcombank/";

/// Phú Quý's live board carries the silver rows alongside gold.
const SILVER_PAGE: &str = "https://banggia1.phuquygroup.vn/";

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script regex"))
}

fn style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("style regex"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"))
}

fn break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<(?:br|/tr|/p|/div|/li|/h[1-6]|/table|/section)[^>]*>")
            .expect("break regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\u{00A0}]+").expect("space regex"))
}

/// Flatten HTML into line-oriented text. Table rows and block elements
/// become line breaks so one quote row stays on one line.
pub fn html_to_text(html: &str) -> String {
    let stripped = script_re().replace_all(html, " ");
    let stripped = style_re().replace_all(&stripped, " ");
    let stripped = comment_re().replace_all(&stripped, " ");
    let broken = break_re().replace_all(&stripped, "\n");
    let text = tag_re().replace_all(&broken, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    text.lines()
        .map(|line| space_re().replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetches a page and yields its flattened text.
pub struct HttpTextAdapter {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpTextAdapter {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for HttpTextAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SourceYield> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {}", self.url))?
            .error_for_status()
            .with_context(|| format!("GET {}", self.url))?;
        let html = response.text().await.with_context(|| format!("body of {}", self.url))?;
        let body = html_to_text(&html);
        let source_time = source_timestamp(&body);
        Ok(SourceYield::RawText { body, source_time })
    }
}

pub fn build_client(config: &AggregatorConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .context("building http client")
}

/// Row labels on the Bảo Tín Mạnh Hải vendor page, which quotes its own
/// products rather than the generic bar/ring rows.
pub fn btmh_vendor_profile() -> ExtractionProfile {
    ExtractionProfile {
        bar: FieldProfile::new("vàng miếng sjc", "vàng miếng sjc", 0),
        ring: FieldProfile::new("nhẫn ép vỉ kim gia bảo", "nhẫn ép vỉ kim gia bảo", 2),
    }
}

fn vendor_source(brand: Brand, client: &reqwest::Client) -> FeedSource {
    let (url, hint, profile) = match brand {
        Brand::Sjc => ("https://sjc.com.vn/", UnitHint::BaseUnit, None),
        Brand::Pnj => ("https://www.giavang.pnj.com.vn/", UnitHint::BaseUnit, None),
        Brand::Doji => (
            "https://giavang.doji.vn/trangchu.html",
            UnitHint::BaseUnit,
            None,
        ),
        Brand::Btmc => (
            "https://baotinminhchau.com/gia-vang",
            UnitHint::BaseUnit,
            None,
        ),
        // Quotes VND per chỉ.
        Brand::Btmh => (
            "https://www.baotinmanhhai.vn/gia-vang-hom-nay",
            UnitHint::PerSubUnit(10),
            Some(btmh_vendor_profile()),
        ),
        Brand::PhuQuy => ("https://banggia1.phuquygroup.vn/", UnitHint::BaseUnit, None),
        Brand::MiHong => (
            "https://www.mihong.vn/vi/gia-vang-trong-nuoc",
            UnitHint::BaseUnit,
            None,
        ),
        Brand::NgocTham => (
            "https://ngoctham.com/bang-gia-vang/",
            UnitHint::BaseUnit,
            None,
        ),
    };
    let adapter = Arc::new(HttpTextAdapter::new(
        format!("{}-vendor", brand.as_str().to_lowercase()),
        url,
        client.clone(),
    ));
    let mut source = FeedSource::new(adapter).with_unit_hint(hint);
    if let Some(profile) = profile {
        source = source.with_profile(profile);
    }
    source
}

/// Assemble the gold brand feeds, the silver feed and the exchange feed.
pub fn build_feeds(
    config: &AggregatorConfig,
    client: &reqwest::Client,
) -> (Vec<BrandFeed>, SilverFeed, FxFeed) {
    let gold = BOARD_PAGES
        .iter()
        .map(|(brand, url)| {
            let board = FeedSource::new(Arc::new(HttpTextAdapter::new(
                format!("giavang-{}", brand.as_str().to_lowercase()),
                *url,
                client.clone(),
            )));
            let mut sources = vec![board];
            if config.enable_vendor_fallback {
                sources.push(vendor_source(*brand, client));
            }
            BrandFeed::new(*brand, sources)
        })
        .collect();

    let silver = SilverFeed::new(vec![FeedSource::new(Arc::new(HttpTextAdapter::new(
        "phuquy-silver",
        SILVER_PAGE,
        client.clone(),
    )))]);

    let fx = FxFeed::new(vec![FeedSource::new(Arc::new(HttpTextAdapter::new(
        "vietcombank",
        FX_PAGE,
        client.clone(),
    )))]);

    (gold, silver, fx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldboard_core::reconcile::{reconcile_brand, reconcile_silver, structured_match};
    use goldboard_core::types::QuoteValue;

    #[test]
    fn test_html_to_text_keeps_rows_on_lines() {
        let html = r#"<html><head><script>var x = 99999;</script>
            <style>.a { width: 10000px; }</style></head>
            <body><table>
            <tr><td>Vàng miếng SJC</td><td>140.500</td><td>141.300</td></tr>
            <tr><td>Vàng nhẫn</td><td>138.500</td><td>140.200</td></tr>
            </table><!-- 77777 --></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Vàng miếng SJC 140.500 141.300"));
        assert!(text.contains("Vàng nhẫn 138.500 140.200"));
        // Script, style and comment payloads must not leak into tokens.
        assert!(!text.contains("99999"));
        assert!(!text.contains("10000px"));
        assert!(!text.contains("77777"));
    }

    #[test]
    fn test_html_entities_decoded() {
        let text = html_to_text("<p>Mua&nbsp;140.500 &amp; B&#39;an</p>");
        assert!(text.contains("Mua 140.500 & B'an"));
    }

    #[test]
    fn test_btmh_vendor_rows_convert_per_chi() {
        let text = "Vàng miếng SJC (999.9) 14.050.000 14.130.000\nNhẫn ép vỉ Kim Gia Bảo 13.860.000 14.010.000";
        let rec = reconcile_brand(text, &btmh_vendor_profile(), UnitHint::PerSubUnit(10));
        let buy = match rec.bar.pair.buy {
            QuoteValue::Available(v) => v.millis(),
            QuoteValue::Unavailable => panic!("bar buy missing"),
        };
        assert_eq!(buy, 140_500);
        let ring_sell = rec.ring.pair.sell.value().unwrap().millis();
        assert_eq!(ring_sell, 140_100);
    }

    #[test]
    fn test_structured_match_on_flattened_board_page() {
        let html = "<tr><th>Loại</th></tr><tr><td>Vàng miếng</td><td>140.500</td><td>141.300</td></tr>";
        let text = html_to_text(html);
        let field = FieldProfile::new("miếng", "giá vàng miếng", 0);
        let pair = structured_match(&text, &field, UnitHint::BaseUnit).unwrap();
        assert_eq!(pair.buy.value().unwrap().millis(), 140_500);
    }

    #[test]
    fn test_silver_rows_from_flattened_board() {
        let html = "<table>\
            <tr><td>BẠC MIẾNG PHÚ QUÝ 500 LƯỢNG</td><td>690.000.000</td><td>700.000.000</td></tr>\
            <tr><td>BẠC MIẾNG PHÚ QUÝ (999) 1 LƯỢNG</td><td>1.382.600</td><td>1.425.400</td></tr>\
            <tr><td>BẠC THỎI PHÚ QUÝ 1 KG</td><td>36.930.000</td><td>37.230.000</td></tr>\
            </table>";
        let text = html_to_text(html);
        let rec = reconcile_silver(&text, UnitHint::BaseUnit);
        assert_eq!(rec.bar.pair.buy.value().unwrap().millis(), 1_383);
        assert_eq!(rec.ingot.pair.sell.value().unwrap().millis(), 37_230);
    }

    #[test]
    fn test_build_feeds_covers_every_brand() {
        let config = AggregatorConfig {
            cycle_interval_secs: 60,
            sanity_bound_millions: 50.0,
            snapshot_dir: "data/snapshots".to_string(),
            baseline_anchor_date: None,
            http_timeout_secs: 10,
            user_agent: "test".to_string(),
            enable_vendor_fallback: true,
        };
        let client = build_client(&config).unwrap();
        let (gold, silver, fx) = build_feeds(&config, &client);
        assert_eq!(gold.len(), Brand::ALL.len());
        assert!(gold.iter().all(|f| f.sources.len() == 2));
        assert_eq!(silver.sources.len(), 1);
        assert_eq!(fx.sources.len(), 1);

        let no_fallback = AggregatorConfig {
            enable_vendor_fallback: false,
            ..config
        };
        let (gold, _, _) = build_feeds(&no_fallback, &client);
        assert!(gold.iter().all(|f| f.sources.len() == 1));
    }
}
