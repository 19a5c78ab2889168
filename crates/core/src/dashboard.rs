//! Dashboard state: the live-price simulation and the derived trend views.
//!
//! The simulation only ever works on a [`LiveQuote`], a display copy taken from the canonical
//! [`PredictionResult`]. Jitter is cosmetic and must never leak back into the valuation that
//! chat and the media editor read.

use crate::constants::{DEFAULT_LIVE_TICK, LIVE_JITTER, LIVE_REFRESH_DELAY};
use crate::error::ValidationError;
use crate::prediction::{MarketTrend, PredictionResult};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Leading calendar year of a trend period ("2025", "2025 Q3", "2026-27").
///
/// Returns `None` when the period does not start with digits.
pub fn period_year(period: &str) -> Option<i32> {
    let digits: String = period
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Simulated live view of a valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveQuote {
    pub predicted_price: f64,
    pub market_trends: Vec<MarketTrend>,
    pub last_updated: DateTime<Utc>,
    /// Set while a refresh is pending, for the "updating" indicator.
    pub updating: bool,
}

impl LiveQuote {
    pub fn from_result(result: &PredictionResult) -> Self {
        Self {
            predicted_price: result.predicted_price,
            market_trends: result.market_trends.clone(),
            last_updated: Utc::now(),
            updating: false,
        }
    }

    /// Draw one jitter factor from `[1 - LIVE_JITTER, 1 + LIVE_JITTER)` and apply it.
    ///
    /// Returns the factor used.
    pub fn tick<R: Rng>(&mut self, rng: &mut R, present_year: i32) -> f64 {
        let factor = rng.gen_range((1.0 - LIVE_JITTER)..(1.0 + LIVE_JITTER));
        self.apply_factor(factor, present_year);
        factor
    }

    /// Rescale the headline price and every present or future trend point by `factor`.
    ///
    /// Past periods and periods without a leading year are left untouched. All rescaled
    /// amounts are rounded to whole rupees.
    pub fn apply_factor(&mut self, factor: f64, present_year: i32) {
        self.predicted_price = (self.predicted_price * factor).round();

        for point in &mut self.market_trends {
            if period_year(&point.period).is_some_and(|year| year >= present_year) {
                point.price = (point.price * factor).round();
                point.high = (point.high * factor).round();
                point.low = (point.low * factor).round();
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LiveFeedConfig {
    pub tick: Duration,
    pub refresh_delay: Duration,
    pub present_year: i32,
}

impl LiveFeedConfig {
    pub fn new(present_year: i32) -> Self {
        Self {
            tick: DEFAULT_LIVE_TICK,
            refresh_delay: LIVE_REFRESH_DELAY,
            present_year,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Handle to a running live-price simulation. Dropping it stops the task.
pub struct LiveFeed {
    receiver: watch::Receiver<LiveQuote>,
    handle: JoinHandle<()>,
}

impl LiveFeed {
    /// A new receiver that sees every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<LiveQuote> {
        self.receiver.clone()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> LiveQuote {
        self.receiver.borrow().clone()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start the live-price simulation for `result` on the current tokio runtime.
///
/// Every `config.tick` the task publishes an updating snapshot, waits `config.refresh_delay`,
/// applies one jitter factor and publishes the refreshed quote.
pub fn spawn_live_feed(result: &PredictionResult, config: LiveFeedConfig) -> LiveFeed {
    let (sender, receiver) = watch::channel(LiveQuote::from_result(result));

    let handle = tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let start = tokio::time::Instant::now() + config.tick;
        let mut interval = tokio::time::interval_at(start, config.tick);

        loop {
            interval.tick().await;

            let mut quote = sender.borrow().clone();
            quote.updating = true;
            if sender.send(quote.clone()).is_err() {
                break;
            }

            tokio::time::sleep(config.refresh_delay).await;

            let factor = quote.tick(&mut rng, config.present_year);
            quote.updating = false;
            quote.last_updated = Utc::now();
            tracing::debug!(factor, price = quote.predicted_price, "live quote refreshed");
            if sender.send(quote).is_err() {
                break;
            }
        }
    });

    LiveFeed { receiver, handle }
}

/// Range of trend periods shown on the trajectory chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    All,
    /// One year either side of the present.
    ThreeYearWindow,
    LastYear,
    LastThreeYears,
}

impl FromStr for TimeFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TimeFilter::All),
            "3y-window" | "window" => Ok(TimeFilter::ThreeYearWindow),
            "1y" | "last-1y" => Ok(TimeFilter::LastYear),
            "3y" | "last-3y" => Ok(TimeFilter::LastThreeYears),
            other => Err(ValidationError::InvalidInput(format!(
                "unknown time filter '{other}' (expected all, 3y-window, last-1y or last-3y)"
            ))),
        }
    }
}

impl TimeFilter {
    pub fn label(&self) -> &'static str {
        match self {
            TimeFilter::All => "All",
            TimeFilter::ThreeYearWindow => "3Y Window",
            TimeFilter::LastYear => "Last 1Y",
            TimeFilter::LastThreeYears => "Last 3Y",
        }
    }

    pub fn includes(&self, period: &str, present_year: i32) -> bool {
        match (self, period_year(period)) {
            (TimeFilter::All, _) => true,
            (_, None) => false,
            (TimeFilter::ThreeYearWindow, Some(year)) => (year - present_year).abs() <= 1,
            (TimeFilter::LastYear, Some(year)) => (present_year - 1..=present_year).contains(&year),
            (TimeFilter::LastThreeYears, Some(year)) => {
                (present_year - 3..=present_year).contains(&year)
            }
        }
    }

    pub fn apply<'a>(&self, trends: &'a [MarketTrend], present_year: i32) -> Vec<&'a MarketTrend> {
        trends
            .iter()
            .filter(|t| self.includes(&t.period, present_year))
            .collect()
    }
}

/// What-if uplift shown on top of the live price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    CommercialHubShift,
    InfraCorridor,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 2] = [
        MarketScenario::CommercialHubShift,
        MarketScenario::InfraCorridor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MarketScenario::CommercialHubShift => "Comm. Hub Shift",
            MarketScenario::InfraCorridor => "Infra Corridor",
        }
    }

    /// Fraction of the predicted price added while the scenario is active.
    pub fn uplift(&self) -> f64 {
        match self {
            MarketScenario::CommercialHubShift => 0.12,
            MarketScenario::InfraCorridor => 0.25,
        }
    }

    /// Rupee amount added to a valuation of `predicted_price`.
    pub fn delta(&self, predicted_price: f64) -> f64 {
        predicted_price * self.uplift()
    }

    /// The scenario that is active after picking `picked`: picking the active one clears it,
    /// picking another replaces it.
    pub fn toggle(active: Option<Self>, picked: Self) -> Option<Self> {
        if active == Some(picked) {
            None
        } else {
            Some(picked)
        }
    }
}

impl FromStr for MarketScenario {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        match normalised.as_str() {
            "commhubshift" | "commercialhubshift" | "commhub" => {
                Ok(MarketScenario::CommercialHubShift)
            }
            "infracorridor" | "infra" => Ok(MarketScenario::InfraCorridor),
            _ => Err(ValidationError::InvalidInput(format!(
                "unknown market scenario '{}'",
                s.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendPhase {
    Past,
    Present,
    Future,
}

impl TrendPhase {
    /// Unparseable periods count as past.
    pub fn classify(period: &str, present_year: i32) -> Self {
        match period_year(period) {
            Some(year) if year == present_year => TrendPhase::Present,
            Some(year) if year > present_year => TrendPhase::Future,
            _ => TrendPhase::Past,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendPhase::Past => "Past Growth",
            TrendPhase::Present => "Present Scenario",
            TrendPhase::Future => "Future Forecast",
        }
    }
}

/// Percentage change from `previous` to `current`; `None` when `previous` is zero.
pub fn growth_percent(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Signed one-decimal label such as `+4.2%` or `-1.0%`.
pub fn growth_label(percent: f64) -> String {
    if percent > 0.0 {
        format!("+{percent:.1}%")
    } else {
        format!("{percent:.1}%")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiPoint {
    pub period: String,
    pub percent: f64,
}

/// Period-over-period growth, keeping only periods whose price actually moved.
///
/// Points whose predecessor has a zero price are skipped.
pub fn roi_series(trends: &[MarketTrend]) -> Vec<RoiPoint> {
    trends
        .windows(2)
        .filter_map(|pair| {
            let percent = growth_percent(pair[0].price, pair[1].price)?;
            if percent == 0.0 {
                return None;
            }
            Some(RoiPoint {
                period: pair[1].period.clone(),
                percent,
            })
        })
        .collect()
}

/// Short rupee label: crores above 1e7, lakhs above 1e5, Indian digit grouping below.
pub fn format_rupee_short(value: f64) -> String {
    if value >= 10_000_000.0 {
        format!("₹{:.2} Cr", value / 10_000_000.0)
    } else if value >= 100_000.0 {
        format!("₹{:.1} L", value / 100_000.0)
    } else {
        format!("₹{}", group_indian(value.round() as i64))
    }
}

fn group_indian(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{sign}{},{tail}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::fixtures::sample_result;

    #[test]
    fn period_year_reads_leading_digits() {
        assert_eq!(period_year("2025"), Some(2025));
        assert_eq!(period_year(" 2026 Q1"), Some(2026));
        assert_eq!(period_year("2026-27"), Some(2026));
        assert_eq!(period_year("FY2025"), None);
        assert_eq!(period_year(""), None);
    }

    #[test]
    fn jitter_leaves_past_periods_and_canonical_result_alone() {
        let result = sample_result();
        let mut quote = LiveQuote::from_result(&result);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            quote.tick(&mut rng, 2025);
        }

        assert_eq!(quote.market_trends[0], result.market_trends[0]);
        assert_eq!(quote.market_trends[1], result.market_trends[1]);
        assert_eq!(result, sample_result());
    }

    #[test]
    fn factor_is_bounded_and_amounts_are_rounded() {
        let result = sample_result();
        let mut quote = LiveQuote::from_result(&result);
        let mut rng = StdRng::seed_from_u64(42);

        let factor = quote.tick(&mut rng, 2025);
        assert!((0.997..1.003).contains(&factor));
        assert_eq!(quote.predicted_price, (9_500_000.0 * factor).round());
        for point in &quote.market_trends[2..] {
            assert_eq!(point.price.fract(), 0.0);
            assert_eq!(point.high.fract(), 0.0);
            assert_eq!(point.low.fract(), 0.0);
        }
    }

    #[test]
    fn apply_factor_rescales_present_and_future_only() {
        let mut quote = LiveQuote::from_result(&sample_result());
        quote.market_trends.push(MarketTrend {
            period: "Next cycle".into(),
            price: 100.0,
            high: 110.0,
            low: 90.0,
        });
        quote.apply_factor(1.002, 2025);

        assert_eq!(quote.market_trends[2].price, 9_519_000.0);
        assert_eq!(quote.market_trends[3].high, 10_721_400.0);
        assert_eq!(quote.market_trends[1].price, 8_800_000.0);
        assert_eq!(quote.market_trends[4].price, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn live_feed_publishes_updating_then_refreshed_quote() {
        let result = sample_result();
        let feed = spawn_live_feed(&result, LiveFeedConfig::new(2025));
        let mut rx = feed.subscribe();

        rx.changed().await.unwrap();
        let pending = rx.borrow_and_update().clone();
        assert!(pending.updating);
        assert_eq!(pending.predicted_price, result.predicted_price);

        rx.changed().await.unwrap();
        let refreshed = rx.borrow_and_update().clone();
        assert!(!refreshed.updating);
        assert_eq!(refreshed.market_trends[0], result.market_trends[0]);
        let ratio = refreshed.predicted_price / result.predicted_price;
        assert!((0.996..1.004).contains(&ratio));

        assert_eq!(feed.latest(), refreshed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_feed_stops_publishing() {
        let feed = spawn_live_feed(
            &sample_result(),
            LiveFeedConfig::new(2025).with_tick(Duration::from_secs(5)),
        );
        let mut rx = feed.subscribe();
        feed.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn time_filters_select_expected_periods() {
        let trends = sample_result().market_trends;
        let periods = |filter: TimeFilter| -> Vec<String> {
            filter
                .apply(&trends, 2025)
                .into_iter()
                .map(|t| t.period.clone())
                .collect()
        };

        assert_eq!(periods(TimeFilter::All).len(), 4);
        assert_eq!(periods(TimeFilter::ThreeYearWindow), ["2024", "2025", "2026"]);
        assert_eq!(periods(TimeFilter::LastYear), ["2024", "2025"]);
        assert_eq!(periods(TimeFilter::LastThreeYears), ["2023", "2024", "2025"]);
        assert!(!TimeFilter::LastYear.includes("soon", 2025));
    }

    #[test]
    fn time_filters_parse_from_flags() {
        assert_eq!("last-3y".parse::<TimeFilter>().unwrap(), TimeFilter::LastThreeYears);
        assert_eq!(" 3Y-Window ".parse::<TimeFilter>().unwrap(), TimeFilter::ThreeYearWindow);
        assert!("decade".parse::<TimeFilter>().is_err());
    }

    #[test]
    fn scenarios_add_their_exact_uplift() {
        let price = sample_result().predicted_price;
        assert_eq!(MarketScenario::CommercialHubShift.delta(price), 9_500_000.0 * 0.12);
        assert_eq!(MarketScenario::InfraCorridor.delta(price), 9_500_000.0 * 0.25);
        assert_eq!(
            "comm. hub shift".parse::<MarketScenario>().unwrap(),
            MarketScenario::CommercialHubShift
        );
        assert_eq!("Infra".parse::<MarketScenario>().unwrap(), MarketScenario::InfraCorridor);
    }

    #[test]
    fn scenario_toggle_is_exclusive() {
        let hub = MarketScenario::CommercialHubShift;
        let infra = MarketScenario::InfraCorridor;

        let active = MarketScenario::toggle(None, hub);
        assert_eq!(active, Some(hub));
        assert_eq!(MarketScenario::toggle(active, infra), Some(infra));
        assert_eq!(MarketScenario::toggle(active, hub), None);
    }

    #[test]
    fn phases_follow_the_present_year() {
        assert_eq!(TrendPhase::classify("2024", 2025), TrendPhase::Past);
        assert_eq!(TrendPhase::classify("2025", 2025), TrendPhase::Present);
        assert_eq!(TrendPhase::classify("2027", 2025), TrendPhase::Future);
        assert_eq!(TrendPhase::classify("later", 2025), TrendPhase::Past);
    }

    #[test]
    fn growth_and_roi_skip_zero_baselines_and_flat_periods() {
        assert_eq!(growth_percent(0.0, 10.0), None);
        assert_eq!(growth_label(growth_percent(100.0, 105.0).unwrap()), "+5.0%");
        assert_eq!(growth_label(growth_percent(100.0, 99.0).unwrap()), "-1.0%");

        let mut trends = sample_result().market_trends;
        trends[1].price = 0.0;
        trends[3].price = trends[2].price;
        let roi = roi_series(&trends);
        assert_eq!(roi.len(), 1);
        assert_eq!(roi[0].period, "2024");
        assert_eq!(roi[0].percent, -100.0);
    }

    #[test]
    fn rupee_labels_use_indian_units() {
        assert_eq!(format_rupee_short(12_500_000.0), "₹1.25 Cr");
        assert_eq!(format_rupee_short(9_500_000.0), "₹95.0 L");
        assert_eq!(format_rupee_short(99_999.0), "₹99,999");
        assert_eq!(format_rupee_short(950.0), "₹950");
        assert_eq!(group_indian(12_345_678), "1,23,45,678");
        assert_eq!(group_indian(-1_234), "-1,234");
    }
}
