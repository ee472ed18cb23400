//! Paginated lap retrieval
//!
//! The laps endpoint counts driver-timing rows, not laps, and the row total
//! is only known after a request. [`LapsPaginator`] probes with `limit=1`,
//! plans the page count from the probe, walks the pages and reassembles a
//! single envelope holding every lap in order.

use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::RequestExecutor;
use super::{validate_season, ClientResult};

/// Drivers per lap assumed when the probe carries no timing rows
pub const DEFAULT_DRIVERS_PER_LAP: u64 = 20;

/// Rows requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pause between consecutive pages
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Rows requested by the probe
const PROBE_LIMIT: u64 = 1;

/// Hard ceiling on pages fetched for one race
pub const MAX_PAGES: u64 = 10_000;

/// Page arithmetic derived from a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapsPlan {
    /// Driver-timing rows reported by the API
    pub total_records: u64,
    /// Timing rows per lap
    pub drivers_per_lap: u64,
    /// Laps in the race (`ceil(total_records / drivers_per_lap)`)
    pub total_laps: u64,
    /// Whole laps that fit in one page (at least one)
    pub laps_per_page: u64,
    /// Pages expected
    pub total_pages: u64,
}

impl LapsPlan {
    /// Plan pages for `total_records` rows; zero drivers falls back to
    /// [`DEFAULT_DRIVERS_PER_LAP`]
    pub fn new(total_records: u64, drivers_per_lap: u64, page_size: u32) -> Self {
        let drivers_per_lap = if drivers_per_lap == 0 {
            DEFAULT_DRIVERS_PER_LAP
        } else {
            drivers_per_lap
        };
        let total_laps = total_records.div_ceil(drivers_per_lap);
        let laps_per_page = (u64::from(page_size) / drivers_per_lap).max(1);
        Self {
            total_records,
            drivers_per_lap,
            total_laps,
            laps_per_page,
            total_pages: total_laps.div_ceil(laps_per_page),
        }
    }
}

/// Progress reported after each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LapsProgress {
    /// Pages fetched so far (1-based)
    pub page: u64,
    /// Pages expected from the plan
    pub total_pages: u64,
    /// Laps accumulated so far
    pub laps_fetched: u64,
    /// Laps expected from the plan
    pub total_laps: u64,
}

/// Probe → pages → reassembled envelope
pub struct LapsPaginator<'a> {
    executor: &'a RequestExecutor,
    page_size: u32,
    page_delay: Duration,
}

impl<'a> LapsPaginator<'a> {
    /// Paginator with the default page size and delay
    pub fn new(executor: &'a RequestExecutor) -> Self {
        Self {
            executor,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Rows per page (at least one)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Pause between pages
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Fetch every lap of a race
    pub async fn fetch_laps(&self, season: &str, round: u32) -> ClientResult<Value> {
        self.fetch_laps_with_progress(season, round, &mut |_| {}).await
    }

    /// Fetch every lap of a race, reporting after each page.
    ///
    /// Fails with [`super::ClientError::InvalidSeason`] before any request
    /// when `season` is not a year or `current`. Returns the probe unchanged
    /// when it has no race container or total.
    /// Stops early on an empty page, a page without the race structure, or
    /// after [`MAX_PAGES`].
    pub async fn fetch_laps_with_progress(
        &self,
        season: &str,
        round: u32,
        on_page: &mut (dyn FnMut(LapsProgress) + Send),
    ) -> ClientResult<Value> {
        validate_season(season)?;
        let endpoint = format!("{season}/{round}/laps");
        let probe = self
            .executor
            .fetch(&endpoint, &page_params(season, round, 0, PROBE_LIMIT))
            .await?;

        let Some(probe_info) = read_probe(&probe) else {
            debug!(endpoint = %endpoint, "Probe has no race data, returning it as is");
            return Ok(probe);
        };
        let mut plan = LapsPlan::new(
            probe_info.total,
            probe_info.drivers_per_lap.unwrap_or(0),
            self.page_size,
        );
        let mut plan_settled = probe_info.drivers_per_lap.is_some();

        info!(
            "Fetching {} laps over {} pages ({} drivers per lap)",
            plan.total_laps, plan.total_pages, plan.drivers_per_lap
        );

        let mut laps: Vec<Value> = Vec::new();
        let mut offset: u64 = 0;
        let mut page: u64 = 0;

        while (laps.len() as u64) < plan.total_laps {
            if page >= MAX_PAGES {
                warn!(
                    pages = page,
                    laps = laps.len(),
                    "Page ceiling reached, stopping pagination"
                );
                break;
            }
            page += 1;

            let response = self
                .executor
                .fetch(
                    &endpoint,
                    &page_params(season, round, offset, u64::from(self.page_size)),
                )
                .await?;

            let Some(new_laps) = race_laps(&response) else {
                debug!(page, "Page has no race structure, stopping");
                break;
            };
            if new_laps.is_empty() {
                debug!(page, "Empty page, stopping");
                break;
            }

            if !plan_settled {
                plan_settled = true;
                if let Some(drivers) = page_drivers_per_lap(new_laps, self.page_size) {
                    plan = LapsPlan::new(probe_info.total, drivers, self.page_size);
                    info!(
                        "Replanned from first page: {} laps over {} pages ({} drivers per lap)",
                        plan.total_laps, plan.total_pages, plan.drivers_per_lap
                    );
                }
            }

            append_laps(&mut laps, new_laps);
            offset += u64::from(self.page_size);

            let progress = LapsProgress {
                page,
                total_pages: plan.total_pages,
                laps_fetched: laps.len() as u64,
                total_laps: plan.total_laps,
            };
            info!(
                "Page {}/{}: {} of {} laps",
                progress.page, progress.total_pages, progress.laps_fetched, progress.total_laps
            );
            on_page(progress);

            if (laps.len() as u64) < plan.total_laps && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        laps.truncate(usize::try_from(plan.total_laps).unwrap_or(usize::MAX));
        info!("Fetched {} race laps", laps.len());

        Ok(assemble(&probe, probe_info.race, laps, plan.drivers_per_lap))
    }
}

fn page_params(season: &str, round: u32, offset: u64, limit: u64) -> Vec<(&'static str, String)> {
    vec![
        ("season", season.to_string()),
        ("round", round.to_string()),
        ("offset", offset.to_string()),
        ("limit", limit.to_string()),
    ]
}

/// `MRData.RaceTable.Races[0]` as an object
fn first_race(envelope: &Value) -> Option<&Map<String, Value>> {
    envelope
        .get("MRData")?
        .get("RaceTable")?
        .get("Races")?
        .get(0)?
        .as_object()
}

fn race_laps(envelope: &Value) -> Option<&[Value]> {
    first_race(envelope)?
        .get("Laps")?
        .as_array()
        .map(Vec::as_slice)
}

/// `total` arrives as a string, occasionally as a number
fn parse_total(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// What the `limit=1` probe tells us about the race
struct ProbeInfo {
    race: Map<String, Value>,
    total: u64,
    /// `None` when the probe's first lap was cut short by the probe limit
    drivers_per_lap: Option<u64>,
}

fn timing_count(lap: &Value) -> u64 {
    lap.get("Timings")
        .and_then(Value::as_array)
        .map_or(0, |timings| timings.len() as u64)
}

fn read_probe(probe: &Value) -> Option<ProbeInfo> {
    let race = first_race(probe)?;
    let total = parse_total(probe.get("MRData")?.get("total")?)?;
    let drivers = race
        .get("Laps")
        .and_then(Value::as_array)
        .and_then(|laps| laps.first())
        .map_or(0, timing_count);

    Some(ProbeInfo {
        race: race.clone(),
        total,
        drivers_per_lap: (drivers > PROBE_LIMIT).then_some(drivers),
    })
}

/// Drivers per lap read from the first lap of the first page.
///
/// Only trusted when that lap is known to be whole: the page holds more
/// than one lap, or it came back short of `page_size` rows.
fn page_drivers_per_lap(laps: &[Value], page_size: u32) -> Option<u64> {
    let first = timing_count(laps.first()?);
    if first == 0 {
        return None;
    }
    let rows: u64 = laps.iter().map(timing_count).sum();
    (laps.len() > 1 || rows < u64::from(page_size)).then_some(first)
}

fn lap_number(lap: &Value) -> Option<&str> {
    lap.get("number").and_then(Value::as_str)
}

/// Append a page, joining a lap that the page boundary split in two
fn append_laps(laps: &mut Vec<Value>, page: &[Value]) {
    let mut rest = page;

    if let (Some(last), Some((first, tail))) = (laps.last_mut(), page.split_first()) {
        let same_lap = lap_number(last).is_some_and(|n| Some(n) == lap_number(first));
        if same_lap {
            let extra = first.get("Timings").and_then(Value::as_array);
            let into = last.get_mut("Timings").and_then(Value::as_array_mut);
            if let (Some(into), Some(extra)) = (into, extra) {
                into.extend(extra.iter().cloned());
                rest = tail;
            }
        }
    }

    laps.extend(rest.iter().cloned());
}

/// Probe envelope with `total` rewritten and the race's laps replaced.
///
/// Other `MRData`, `RaceTable` and race fields are carried over from the
/// probe.
fn assemble(
    probe: &Value,
    mut race: Map<String, Value>,
    laps: Vec<Value>,
    drivers_per_lap: u64,
) -> Value {
    let mut mr_data = probe
        .get("MRData")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let mut race_table = mr_data
        .get("RaceTable")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let total = laps.len() as u64 * drivers_per_lap;
    race.insert("Laps".to_string(), Value::Array(laps));
    race_table.insert("Races".to_string(), Value::Array(vec![Value::Object(race)]));
    mr_data.insert("total".to_string(), Value::String(total.to_string()));
    mr_data.insert("RaceTable".to_string(), Value::Object(race_table));

    let mut envelope = Map::new();
    envelope.insert("MRData".to_string(), Value::Object(mr_data));
    Value::Object(envelope)
}
