//! Reads the raw strings of a [`Snapshot`] out of a saved analytics page.
//!
//! The page layout is assumed fixed. Anything the selectors don't find comes
//! back as an empty string or an empty list rather than an error.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::chart::{ChartDecoder, ChartGeometry};
use crate::domain::{has_valid_tld, normalize_domain};
use crate::error::FormatError;
use crate::model::Snapshot;

const DOMAIN: &str = "#overview .wa-overview__title";
const DATE: &str = "#overview .wa-overview__text--date";
const GLOBAL_RANK: &str = "#overview .wa-rank-list__item--global .wa-rank-list__value";
const ENGAGEMENT_ITEMS: &str =
    "#overview .wa-overview__column--engagement .engagement-list__item";
const ENGAGEMENT_VALUE: &str = ".engagement-list__item-value";
const RANK_CHART: &str = "#ranking svg.highcharts-root";
const AXIS_LABELS: &str = ".highcharts-yaxis-labels text";
const MARKERS: &str = ".highcharts-markers path";
const VISITS_HISTORY: &str = "#traffic .wa-traffic__chart-data-label";
const COUNTRY_NAMES: &str = "#geography .wa-geography__country-name";
const COUNTRY_SHARES: &str = "#geography .wa-geography__country-traffic-value";
const AGE_SHARES: &str = "#demographics .wa-demographics__age-data-label";

// Positions of the engagement list items, counted from 1.
const TOTAL_VISITS_ITEM: usize = 1;
const BOUNCE_RATE_ITEM: usize = 2;
const AVG_DURATION_ITEM: usize = 4;

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {css:?}: {e}"))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn text_at(dom: &Html, css: &str) -> Result<String> {
    Ok(dom.select(&selector(css)?).next().map(text_of).unwrap_or_default())
}

fn text_list_at(dom: &Html, css: &str) -> Result<Vec<String>> {
    Ok(dom.select(&selector(css)?).map(text_of).collect())
}

fn engagement_item(dom: &Html, position: usize) -> Result<String> {
    let value = selector(ENGAGEMENT_VALUE)?;
    Ok(dom
        .select(&selector(ENGAGEMENT_ITEMS)?)
        .nth(position - 1)
        .and_then(|item| item.select(&value).next())
        .map(text_of)
        .unwrap_or_default())
}

/// Isolates the rank chart's geometry. `Ok(None)` when the page has no chart.
pub fn rank_chart_geometry(dom: &Html) -> Result<Option<Result<ChartGeometry, FormatError>>> {
    let Some(svg) = dom.select(&selector(RANK_CHART)?).next() else {
        return Ok(None);
    };
    let axis_labels = svg.select(&selector(AXIS_LABELS)?).map(text_of).collect();
    let marker_paths = svg
        .select(&selector(MARKERS)?)
        .filter_map(|path| path.value().attr("d"))
        .map(str::to_string)
        .collect();
    let height = svg.value().attr("height").unwrap_or_default();
    Ok(Some(ChartGeometry::from_raw(height, axis_labels, marker_paths)))
}

/// Extracts one page. A rank chart that can't be decoded is reported and
/// leaves the rank history empty.
pub fn parse_page(html: &str, decoder: &dyn ChartDecoder) -> Result<Snapshot> {
    let dom = Html::parse_document(html);

    let domain = normalize_domain(&text_at(&dom, DOMAIN)?);
    if !has_valid_tld(&domain) {
        warn!(action = "parse", component = "page_extraction", domain = %domain, "Page title doesn't look like a domain");
    }

    let past_category_ranks = match rank_chart_geometry(&dom)? {
        Some(geometry) => match geometry.and_then(|chart| decoder.decode(&chart)) {
            Ok(ranks) => ranks,
            Err(e) => {
                warn!(action = "decode", component = "rank_chart", domain = %domain, error = %e, "Chart unavailable");
                Vec::new()
            }
        },
        None => {
            warn!(action = "decode", component = "rank_chart", domain = %domain, "Chart unavailable: not found on page");
            Vec::new()
        }
    };

    let countries = text_list_at(&dom, COUNTRY_NAMES)?;
    let shares = text_list_at(&dom, COUNTRY_SHARES)?;

    Ok(Snapshot {
        date: text_at(&dom, DATE)?,
        global_rank: text_at(&dom, GLOBAL_RANK)?,
        total_visits: engagement_item(&dom, TOTAL_VISITS_ITEM)?,
        bounce_rate: engagement_item(&dom, BOUNCE_RATE_ITEM)?,
        avg_visit_duration: engagement_item(&dom, AVG_DURATION_ITEM)?,
        past_category_ranks,
        past_total_visits: text_list_at(&dom, VISITS_HISTORY)?,
        top_countries: countries.into_iter().zip(shares).collect(),
        age_distribution: text_list_at(&dom, AGE_SHARES)?,
        domain,
    })
}
