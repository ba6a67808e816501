//! Market Session
//!
//! Exchange clock for the strategy: trading days, regular hours, the entry
//! cutoff and the mandatory square-off. All comparisons happen in exchange
//! local time derived from a fixed UTC offset.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc, Weekday,
};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

/// NSE cash/F&O hours in IST
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Invalid time '{0}' (expected HH:MM)")]
    InvalidTime(String),
    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
    #[error("Session times out of order: open {open} < entry cutoff {entry_cutoff} <= square-off {square_off} <= close {close} required")]
    OutOfOrder {
        open: NaiveTime,
        entry_cutoff: NaiveTime,
        square_off: NaiveTime,
        close: NaiveTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketPhase {
    Holiday,
    PreMarket,
    Regular,
    /// No new entries, existing positions still managed
    EntryCutoff,
    /// All positions must be flattened
    SquareOff,
    PostMarket,
}

#[derive(Debug, Clone)]
pub struct MarketSession {
    market_open: NaiveTime,
    market_close: NaiveTime,
    entry_cutoff: NaiveTime,
    square_off: NaiveTime,
    utc_offset: FixedOffset,
    holidays: BTreeSet<NaiveDate>,
}

/// Parse an "HH:MM" wall-clock time
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, SessionError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| SessionError::InvalidTime(value.to_string()))
}

/// Parse a "YYYY-MM-DD" date
pub fn parse_date(value: &str) -> Result<NaiveDate, SessionError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| SessionError::InvalidDate(value.to_string()))
}

impl MarketSession {
    pub fn new(
        market_open: NaiveTime,
        market_close: NaiveTime,
        entry_cutoff: NaiveTime,
        square_off: NaiveTime,
        utc_offset_minutes: i32,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<Self, SessionError> {
        let utc_offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or(SessionError::InvalidOffset(utc_offset_minutes))?;

        let ordered = market_open < entry_cutoff
            && entry_cutoff <= square_off
            && square_off <= market_close;
        if !ordered {
            return Err(SessionError::OutOfOrder {
                open: market_open,
                entry_cutoff,
                square_off,
                close: market_close,
            });
        }

        Ok(Self {
            market_open,
            market_close,
            entry_cutoff,
            square_off,
            utc_offset,
            holidays: holidays.into_iter().collect(),
        })
    }

    pub fn entry_cutoff(&self) -> NaiveTime {
        self.entry_cutoff
    }

    pub fn square_off_time(&self) -> NaiveTime {
        self.square_off
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.utc_offset).time()
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.utc_offset).date_naive()
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Within regular hours on a trading day (both ends inclusive)
    pub fn is_trading_time(&self, now: DateTime<Utc>) -> bool {
        let t = self.local_time(now);
        self.is_trading_day(self.local_date(now)) && t >= self.market_open && t <= self.market_close
    }

    /// New entries only between the open and the entry cutoff
    pub fn entries_allowed(&self, now: DateTime<Utc>) -> bool {
        let t = self.local_time(now);
        self.is_trading_day(self.local_date(now)) && t >= self.market_open && t < self.entry_cutoff
    }

    /// At or past the mandatory square-off time of the local day
    pub fn is_square_off(&self, now: DateTime<Utc>) -> bool {
        self.local_time(now) >= self.square_off
    }

    pub fn phase(&self, now: DateTime<Utc>) -> MarketPhase {
        if !self.is_trading_day(self.local_date(now)) {
            return MarketPhase::Holiday;
        }
        let t = self.local_time(now);
        if t < self.market_open {
            MarketPhase::PreMarket
        } else if t > self.market_close {
            MarketPhase::PostMarket
        } else if t >= self.square_off {
            MarketPhase::SquareOff
        } else if t >= self.entry_cutoff {
            MarketPhase::EntryCutoff
        } else {
            MarketPhase::Regular
        }
    }

    /// UTC instant of local midnight for the session day containing `now`
    pub fn day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_midnight = self.local_date(now).and_time(NaiveTime::MIN);
        let utc_midnight = local_midnight - Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_midnight)
    }

    /// Seconds until the close, None outside trading hours
    pub fn time_until_close(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_trading_time(now) {
            return None;
        }
        Some((self.market_close - self.local_time(now)).num_seconds())
    }
}

fn wall_clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for MarketSession {
    fn default() -> Self {
        Self {
            market_open: wall_clock(9, 15),
            market_close: wall_clock(15, 30),
            entry_cutoff: wall_clock(15, 0),
            square_off: wall_clock(15, 15),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix()),
            holidays: BTreeSet::new(),
        }
    }
}
