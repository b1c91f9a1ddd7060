//! Statistics aggregation over chats and deals.
//!
//! Everything here is pure: the service loads the rows for a window and hands
//! them to [`aggregate`], which produces the snapshot the analytics screen renders.

use crate::infrastructure::entities::{Chat, Deal, DealStatus};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Span used when the caller gives no start date.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid date {0:?}, use ISO format")]
    InvalidDate(String),
    #[error("start_date must not be after end_date")]
    Reversed,
    #[error("date is out of range")]
    OutOfRange,
}

/// One bound of a requested range, before it is pinned to a time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// Carries its own offset, or `Z`.
    Instant(DateTime<Utc>),
    /// Wall-clock time in the configured offset.
    Local(NaiveDateTime),
    /// Whole calendar day in the configured offset.
    Day(NaiveDate),
}

impl DateBound {
    pub fn parse(raw: &str) -> Result<Self, WindowError> {
        let raw = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(DateBound::Instant(dt.to_utc()));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(DateBound::Local(naive));
            }
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(DateBound::Day)
            .map_err(|_| WindowError::InvalidDate(raw.to_owned()))
    }

    fn first_instant(self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            DateBound::Instant(instant) => Some(instant),
            DateBound::Local(naive) => local_to_utc(naive, offset),
            DateBound::Day(date) => local_to_utc(date.and_hms_opt(0, 0, 0)?, offset),
        }
    }

    fn last_instant(self, offset: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            DateBound::Day(date) => {
                local_to_utc(date.and_hms_nano_opt(23, 59, 59, 999_999_999)?, offset)
            }
            other => other.first_instant(offset),
        }
    }
}

fn local_to_utc(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    naive.and_local_timezone(offset).single().map(|dt| dt.to_utc())
}

/// The `start_date` / `end_date` pair a caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateBound>,
    pub end: Option<DateBound>,
}

impl DateRange {
    /// Parses both bounds. Blank strings count as absent.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, WindowError> {
        let bound = |raw: Option<&str>| {
            raw.filter(|s| !s.trim().is_empty())
                .map(DateBound::parse)
                .transpose()
        };

        Ok(DateRange {
            start: bound(start)?,
            end: bound(end)?,
        })
    }
}

/// Inclusive time range a snapshot is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StatisticsWindow {
    /// Pins `range` to instants, reading dates and bare times in `offset`.
    ///
    /// A missing end means `now`, a missing start means seven days before the end.
    pub fn resolve(
        range: DateRange,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Self, WindowError> {
        let end = match range.end {
            Some(bound) => bound.last_instant(offset).ok_or(WindowError::OutOfRange)?,
            None => now,
        };
        let start = match range.start {
            Some(bound) => bound.first_instant(offset).ok_or(WindowError::OutOfRange)?,
            None => end - Duration::days(DEFAULT_WINDOW_DAYS),
        };

        if start > end {
            return Err(WindowError::Reversed);
        }

        Ok(StatisticsWindow { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDealPoint {
    pub date: NaiveDate,
    pub total_deals: u64,
    pub consultation_scheduled: u64,
    pub individual_consultation_scheduled: u64,
    pub no_response: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTrendPoint {
    pub date: NaiveDate,
    pub average_dialog_cost: f64,
    pub average_conversion_cost: f64,
    pub chat_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub consultation_scheduled: u64,
    pub individual_consultation_scheduled: u64,
    pub no_response: u64,
}

impl StatusDistribution {
    fn record(&mut self, status: DealStatus) {
        match status {
            DealStatus::ConsultationScheduled => self.consultation_scheduled += 1,
            DealStatus::IndividualConsultationScheduled => {
                self.individual_consultation_scheduled += 1
            }
            DealStatus::NoResponse => self.no_response += 1,
        }
    }

    pub fn conversions(&self) -> u64 {
        self.consultation_scheduled + self.individual_consultation_scheduled
    }

    pub fn total(&self) -> u64 {
        self.conversions() + self.no_response
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_deals: u64,
    pub consultation_scheduled: u64,
    pub individual_consultation_scheduled: u64,
    pub no_response: u64,
    pub average_interactions_per_client: f64,
    pub average_dialog_cost: f64,
    pub average_conversion_cost: f64,
    pub total_tokens_used: u64,
    pub total_period_cost: f64,
    pub deals_by_day: Vec<DailyDealPoint>,
    pub daily_costs: Vec<CostTrendPoint>,
    pub status_distribution: StatusDistribution,
    pub total_chats: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl StatisticsSnapshot {
    /// All-zero snapshot for `window`.
    pub fn empty(window: StatisticsWindow) -> Self {
        StatisticsSnapshot {
            total_deals: 0,
            consultation_scheduled: 0,
            individual_consultation_scheduled: 0,
            no_response: 0,
            average_interactions_per_client: 0.0,
            average_dialog_cost: 0.0,
            average_conversion_cost: 0.0,
            total_tokens_used: 0,
            total_period_cost: 0.0,
            deals_by_day: Vec::new(),
            daily_costs: Vec::new(),
            status_distribution: StatusDistribution::default(),
            total_chats: 0,
            period_start: window.start,
            period_end: window.end,
        }
    }
}

/// Builds the snapshot for `window`, bucketing days in `offset`.
///
/// Rows outside the window are ignored.
pub fn aggregate(
    window: StatisticsWindow,
    offset: FixedOffset,
    chats: &[Chat],
    deals: &[Deal],
) -> StatisticsSnapshot {
    let mut snapshot = StatisticsSnapshot::empty(window);
    let day_of = |instant: DateTime<Utc>| instant.with_timezone(&offset).date_naive();

    let mut distribution = StatusDistribution::default();
    let mut deals_by_day: BTreeMap<NaiveDate, DailyDealPoint> = BTreeMap::new();

    for deal in deals.iter().filter(|d| window.contains(d.created_at)) {
        distribution.record(deal.status);

        let date = day_of(deal.created_at);
        let point = deals_by_day.entry(date).or_insert_with(|| DailyDealPoint {
            date,
            total_deals: 0,
            consultation_scheduled: 0,
            individual_consultation_scheduled: 0,
            no_response: 0,
        });
        point.total_deals += 1;
        match deal.status {
            DealStatus::ConsultationScheduled => point.consultation_scheduled += 1,
            DealStatus::IndividualConsultationScheduled => {
                point.individual_consultation_scheduled += 1
            }
            DealStatus::NoResponse => point.no_response += 1,
        }
    }

    snapshot.total_deals = distribution.total();
    snapshot.consultation_scheduled = distribution.consultation_scheduled;
    snapshot.individual_consultation_scheduled = distribution.individual_consultation_scheduled;
    snapshot.no_response = distribution.no_response;
    snapshot.status_distribution = distribution;
    snapshot.deals_by_day = deals_by_day.into_values().collect();

    let chats: Vec<&Chat> = chats
        .iter()
        .filter(|c| window.contains(c.started_at))
        .collect();
    if chats.is_empty() {
        return snapshot;
    }

    let chat_count = chats.len() as f64;
    let total_interactions: i64 = chats.iter().map(|c| c.total_interactions.max(0)).sum();
    let total_cost: f64 = chats.iter().map(|c| dialog_cost(c)).sum();
    let total_tokens: i64 = chats
        .iter()
        .map(|c| c.total_tokens_used.unwrap_or(0).max(0))
        .sum();

    snapshot.total_chats = chats.len() as u64;
    snapshot.average_interactions_per_client = round2(total_interactions as f64 / chat_count);
    snapshot.average_dialog_cost = round2(total_cost / chat_count);
    snapshot.average_conversion_cost =
        round2(per_conversion(total_cost, distribution.conversions()));
    snapshot.total_tokens_used = total_tokens as u64;
    snapshot.total_period_cost = round2(total_cost);

    let mut chats_by_day: BTreeMap<NaiveDate, Vec<&Chat>> = BTreeMap::new();
    for chat in chats {
        chats_by_day.entry(day_of(chat.started_at)).or_default().push(chat);
    }

    snapshot.daily_costs = chats_by_day
        .into_iter()
        .map(|(date, day_chats)| {
            let day_cost: f64 = day_chats.iter().map(|c| dialog_cost(c)).sum();
            let conversions = day_chats.iter().filter(|c| c.status.is_conversion()).count();

            CostTrendPoint {
                date,
                average_dialog_cost: round2(day_cost / day_chats.len() as f64),
                average_conversion_cost: round2(per_conversion(day_cost, conversions as u64)),
                chat_count: day_chats.len() as u64,
            }
        })
        .collect();

    snapshot
}

fn dialog_cost(chat: &Chat) -> f64 {
    chat.dialog_cost.unwrap_or(0.0)
}

fn per_conversion(cost: f64, conversions: u64) -> f64 {
    if conversions == 0 {
        0.0
    } else {
        cost / conversions as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
