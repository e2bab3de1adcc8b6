//! Announcement-date and submission-window calculation.
//!
//! arXiv publishes a new batch of submissions every weekday evening at 20:00
//! on its reference clock. This module maps a reference instant ("now", or an
//! explicit posted date) to the date of the batch that was most recently
//! announced, and that date to the range of original submission timestamps
//! the batch covers.
//!
//! All arithmetic happens on a fixed UTC−5 clock. Summer time is deliberately
//! ignored: the index itself keys its cutoffs to that offset.
//!
//! # Policies
//!
//! The rule has been re-derived several times. Each derivation lives behind
//! one [`AnnouncementPolicy`] variant so that a run uses exactly one of them:
//!
//! | Policy | Announced date | Window |
//! |--------|----------------|--------|
//! | [`EveningCutoff`](AnnouncementPolicy::EveningCutoff) | 20:00 cutoff, Fri/Sat/Sun walk back to Thursday | 14:00 → 13:59:59, Friday → Monday over the weekend |
//! | [`PreviousDay`](AnnouncementPolicy::PreviousDay) | yesterday, Sunday pushed to Saturday | whole calendar day |
//! | [`BusinessDayLag`](AnnouncementPolicy::BusinessDayLag) | today minus N business days | whole calendar day |
//!
//! Nothing in this module logs; callers trace the results.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone,
    Weekday,
};

use crate::error::{Error, Result};

/// Offset of the reference clock, in seconds east of UTC.
pub const REFERENCE_OFFSET_SECS: i32 = -5 * 3600;

/// Hour of the daily announcement on the reference clock.
pub const CUTOFF_HOUR: u32 = 20;

/// The fixed UTC−5 offset every computation runs on.
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECS).expect("reference offset is within ±24h")
}

/// A literal wall-clock time.
pub fn clock(hour: u32, min: u32, sec: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, sec).expect("literal clock time")
}

/// Pin a reference-clock wall time to an instant.
pub fn on_reference_clock(date: NaiveDate, time: NaiveTime) -> DateTime<FixedOffset> {
    match reference_offset().from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => dt,
        _ => unreachable!("a fixed offset maps every wall time exactly once"),
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Days on which no new batch of its own is announced; the walk-back in
/// [`announced_date`] passes over them.
fn is_quiet_evening(day: Weekday) -> bool {
    matches!(day, Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// The day on which a batch of submissions was announced.
///
/// Carries an implicit 20:00 anchor on the reference clock, see
/// [`AnnouncedDate::anchor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnouncedDate(NaiveDate);

impl AnnouncedDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// The announcement instant: 20:00 on the reference clock.
    pub fn anchor(&self) -> DateTime<FixedOffset> {
        on_reference_clock(self.0, clock(CUTOFF_HOUR, 0, 0))
    }
}

impl fmt::Display for AnnouncedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.format("%Y-%m-%d"), self.0.weekday())
    }
}

/// Inclusive range of submission timestamps grouped under one announced date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionWindow {
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl SubmissionWindow {
    pub fn begin(&self) -> DateTime<FixedOffset> {
        self.begin
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn span(&self) -> TimeDelta {
        self.end - self.begin
    }

    /// Whether `instant` falls inside the window, both bounds included.
    pub fn contains<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> bool {
        let instant = instant.with_timezone(&reference_offset());
        self.begin <= instant && instant <= self.end
    }
}

impl fmt::Display for SubmissionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.begin.format("%Y-%m-%d %H:%M:%S %:z"),
            self.end.format("%Y-%m-%d %H:%M:%S %:z")
        )
    }
}

/// Date of the most recent announcement as of `reference`.
///
/// 1. Read `reference` on the UTC−5 clock.
/// 2. Before 20:00 the day's batch is not out yet, so use the previous day.
/// 3. Walk back over Friday, Saturday and Sunday: Friday and Saturday both
///    land on Thursday, and so does a Sunday (reached from a Monday morning
///    or a Sunday evening), which keeps the result off the weekend.
pub fn announced_date<Tz: TimeZone>(reference: &DateTime<Tz>) -> AnnouncedDate {
    let local = reference.with_timezone(&reference_offset()).naive_local();

    let mut day = local.date();
    if local.time() < clock(CUTOFF_HOUR, 0, 0) {
        day = day - Days::new(1);
    }
    while is_quiet_evening(day.weekday()) {
        day = day - Days::new(1);
    }
    AnnouncedDate(day)
}

/// Submission timestamps announced on `date`.
///
/// Monday covers the weekend gap, Friday 14:00 through Monday 13:59:59. Every
/// other weekday covers the previous day 14:00 through the day itself at
/// 13:59:59.
///
/// # Errors
///
/// [`Error::InvalidWindow`] for a Saturday or Sunday. No batch is announced
/// on a weekend, so asking for one means the caller computed a bad date.
pub fn submitted_date_range(date: AnnouncedDate) -> Result<SubmissionWindow> {
    let day = date.date();
    let weekday = day.weekday();
    if is_weekend(weekday) {
        return Err(Error::InvalidWindow { date: day, weekday });
    }

    let lookback = if weekday == Weekday::Mon { 3 } else { 1 };
    Ok(SubmissionWindow {
        begin: on_reference_clock(day - Days::new(lookback), clock(14, 0, 0)),
        end: on_reference_clock(day, clock(13, 59, 59)),
    })
}

/// Yesterday on the reference clock, pushed back one more day when yesterday
/// was a Sunday.
pub fn previous_day_date<Tz: TimeZone>(reference: &DateTime<Tz>) -> AnnouncedDate {
    let today = reference.with_timezone(&reference_offset()).date_naive();
    let mut day = today - Days::new(1);
    if day.weekday() == Weekday::Sun {
        day = day - Days::new(1);
    }
    AnnouncedDate(day)
}

/// Today on the reference clock minus `days` business days (Monday to
/// Friday). Zero returns today.
pub fn business_day_lag_date<Tz: TimeZone>(reference: &DateTime<Tz>, days: u32) -> AnnouncedDate {
    let mut day = reference.with_timezone(&reference_offset()).date_naive();
    let mut remaining = days;
    while remaining > 0 {
        day = day - Days::new(1);
        if !is_weekend(day.weekday()) {
            remaining -= 1;
        }
    }
    AnnouncedDate(day)
}

/// The whole calendar day, 00:00:00 through 23:59:59 on the reference clock.
pub fn whole_day_range(date: AnnouncedDate) -> SubmissionWindow {
    SubmissionWindow {
        begin: on_reference_clock(date.date(), NaiveTime::MIN),
        end: on_reference_clock(date.date(), clock(23, 59, 59)),
    }
}

/// Named rule for turning a reference instant into an announced date and a
/// submission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnouncementPolicy {
    /// 20:00 cutoff with the 14:00 → 13:59:59 windows.
    #[default]
    EveningCutoff,
    /// Superseded: yesterday, whole-day window.
    PreviousDay,
    /// Superseded: N business days ago, whole-day window.
    BusinessDayLag { days: u32 },
}

impl AnnouncementPolicy {
    pub fn announced_date<Tz: TimeZone>(&self, reference: &DateTime<Tz>) -> AnnouncedDate {
        match *self {
            Self::EveningCutoff => announced_date(reference),
            Self::PreviousDay => previous_day_date(reference),
            Self::BusinessDayLag { days } => business_day_lag_date(reference, days),
        }
    }

    pub fn window(&self, date: AnnouncedDate) -> Result<SubmissionWindow> {
        match self {
            Self::EveningCutoff => submitted_date_range(date),
            Self::PreviousDay | Self::BusinessDayLag { .. } => Ok(whole_day_range(date)),
        }
    }

    /// Announced date and window for `reference` under this policy.
    pub fn resolve<Tz: TimeZone>(
        &self,
        reference: &DateTime<Tz>,
    ) -> Result<(AnnouncedDate, SubmissionWindow)> {
        let date = self.announced_date(reference);
        let window = self.window(date)?;
        Ok((date, window))
    }
}

impl fmt::Display for AnnouncementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EveningCutoff => f.write_str("evening-cutoff"),
            Self::PreviousDay => f.write_str("previous-day"),
            Self::BusinessDayLag { days } => write!(f, "business-day-lag({days})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Instant at a wall time on the reference clock.
    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<FixedOffset> {
        on_reference_clock(ymd(y, m, d), clock(h, min, s))
    }

    // January 2024: the 1st is a Monday, the 12th a Friday, the 16th a Tuesday.

    #[test]
    fn test_tuesday_evening_is_tuesday() {
        for (h, m, s) in [(20, 0, 0), (20, 0, 1), (21, 30, 0), (23, 59, 59)] {
            let date = announced_date(&at(2024, 1, 16, h, m, s));
            assert_eq!(date.date(), ymd(2024, 1, 16), "at {h:02}:{m:02}:{s:02}");
        }
    }

    #[test]
    fn test_tuesday_evening_from_utc_instant() {
        // 01:30 UTC on Wednesday is 20:30 on Tuesday at UTC−5.
        let utc = Utc.with_ymd_and_hms(2024, 1, 17, 1, 30, 0).unwrap();
        assert_eq!(announced_date(&utc).date(), ymd(2024, 1, 16));
    }

    #[test]
    fn test_before_cutoff_is_previous_day() {
        let date = announced_date(&at(2024, 1, 17, 19, 59, 59));
        assert_eq!(date.date(), ymd(2024, 1, 16));
    }

    #[test]
    fn test_friday_morning_is_thursday() {
        let date = announced_date(&at(2024, 1, 12, 8, 0, 0));
        assert_eq!(date.date(), ymd(2024, 1, 11));
        assert_eq!(date.weekday(), Weekday::Thu);
    }

    #[test]
    fn test_friday_and_saturday_evenings_are_thursday() {
        assert_eq!(announced_date(&at(2024, 1, 12, 21, 0, 0)).date(), ymd(2024, 1, 11));
        assert_eq!(announced_date(&at(2024, 1, 13, 21, 0, 0)).date(), ymd(2024, 1, 11));
        assert_eq!(announced_date(&at(2024, 1, 13, 8, 0, 0)).date(), ymd(2024, 1, 11));
    }

    #[test]
    fn test_sunday_and_monday_morning_are_thursday() {
        assert_eq!(announced_date(&at(2024, 1, 14, 21, 0, 0)).date(), ymd(2024, 1, 11));
        assert_eq!(announced_date(&at(2024, 1, 15, 8, 0, 0)).date(), ymd(2024, 1, 11));
    }

    #[test]
    fn test_monday_evening_is_monday() {
        assert_eq!(announced_date(&at(2024, 1, 15, 20, 0, 0)).date(), ymd(2024, 1, 15));
    }

    #[test]
    fn test_summer_time_is_ignored() {
        // 20:30 EDT is 19:30 on the fixed UTC−5 clock, still before the cutoff.
        let edt = FixedOffset::west_opt(4 * 3600).unwrap();
        let reference = edt.with_ymd_and_hms(2024, 7, 16, 20, 30, 0).unwrap();
        assert_eq!(announced_date(&reference).date(), ymd(2024, 7, 15));
    }

    #[test]
    fn test_announced_date_never_on_weekend_for_a_year() {
        let mut reference = at(2024, 1, 1, 0, 0, 0);
        let stop = at(2025, 1, 1, 0, 0, 0);
        while reference < stop {
            let date = announced_date(&reference);
            assert!(!is_weekend(date.weekday()), "{reference} -> {date}");
            assert!(submitted_date_range(date).is_ok(), "{reference} -> {date}");
            reference += TimeDelta::minutes(90);
        }
    }

    #[test]
    fn test_anchor_is_cutoff_on_reference_clock() {
        let anchor = AnnouncedDate::new(ymd(2024, 1, 16)).anchor();
        assert_eq!(anchor, at(2024, 1, 16, 20, 0, 0));
        assert_eq!(anchor.offset().local_minus_utc(), REFERENCE_OFFSET_SECS);
    }

    #[test]
    fn test_window_rejects_every_weekend_of_a_year() {
        let mut day = ymd(2024, 1, 1);
        let mut rejected = 0;
        while day.year() == 2024 {
            if is_weekend(day.weekday()) {
                let err = submitted_date_range(AnnouncedDate::new(day)).unwrap_err();
                assert!(matches!(err, Error::InvalidWindow { date, .. } if date == day));
                rejected += 1;
            }
            day = day.succ_opt().unwrap();
        }
        assert_eq!(rejected, 104);
    }

    #[test]
    fn test_monday_window_spans_weekend() {
        let window = submitted_date_range(AnnouncedDate::new(ymd(2024, 1, 15))).unwrap();
        assert_eq!(window.begin(), at(2024, 1, 12, 14, 0, 0));
        assert_eq!(window.end(), at(2024, 1, 15, 13, 59, 59));
        assert_eq!(window.begin().weekday(), Weekday::Fri);
        assert_eq!(window.span(), TimeDelta::days(3) - TimeDelta::seconds(1));
    }

    #[test]
    fn test_weekday_windows_are_one_day_less_one_second() {
        for d in 16..=19 {
            let date = ymd(2024, 1, d);
            let window = submitted_date_range(AnnouncedDate::new(date)).unwrap();
            assert_eq!(window.begin(), at(2024, 1, d - 1, 14, 0, 0));
            assert_eq!(window.end(), at(2024, 1, d, 13, 59, 59));
            assert_eq!(window.span(), TimeDelta::seconds(86_399));
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = submitted_date_range(AnnouncedDate::new(ymd(2024, 1, 16))).unwrap();
        assert!(window.contains(&at(2024, 1, 15, 14, 0, 0)));
        assert!(window.contains(&at(2024, 1, 16, 13, 59, 59)));
        assert!(!window.contains(&at(2024, 1, 16, 14, 0, 0)));
        assert!(!window.contains(&at(2024, 1, 15, 13, 59, 59)));
    }

    #[test]
    fn test_previous_day_policy() {
        // Tuesday -> Monday, Monday -> Saturday (Sunday pushed back).
        assert_eq!(previous_day_date(&at(2024, 1, 16, 9, 0, 0)).date(), ymd(2024, 1, 15));
        assert_eq!(previous_day_date(&at(2024, 1, 15, 9, 0, 0)).date(), ymd(2024, 1, 13));
    }

    #[test]
    fn test_business_day_lag_policy() {
        assert_eq!(business_day_lag_date(&at(2024, 1, 15, 9, 0, 0), 2).date(), ymd(2024, 1, 11));
        assert_eq!(business_day_lag_date(&at(2024, 1, 17, 9, 0, 0), 2).date(), ymd(2024, 1, 15));
        assert_eq!(business_day_lag_date(&at(2024, 1, 13, 9, 0, 0), 1).date(), ymd(2024, 1, 12));
        assert_eq!(business_day_lag_date(&at(2024, 1, 13, 9, 0, 0), 0).date(), ymd(2024, 1, 13));
    }

    #[test]
    fn test_whole_day_range() {
        let window = whole_day_range(AnnouncedDate::new(ymd(2024, 1, 13)));
        assert_eq!(window.begin(), at(2024, 1, 13, 0, 0, 0));
        assert_eq!(window.end(), at(2024, 1, 13, 23, 59, 59));
    }

    #[test]
    fn test_policies_do_not_mix_windows() {
        let reference = at(2024, 1, 17, 21, 0, 0);
        let (date, window) = AnnouncementPolicy::EveningCutoff.resolve(&reference).unwrap();
        assert_eq!(date.date(), ymd(2024, 1, 17));
        assert_eq!(window.begin(), at(2024, 1, 16, 14, 0, 0));

        let (date, window) = AnnouncementPolicy::PreviousDay.resolve(&reference).unwrap();
        assert_eq!(date.date(), ymd(2024, 1, 16));
        assert_eq!(window.begin(), at(2024, 1, 16, 0, 0, 0));

        let (date, _) = AnnouncementPolicy::BusinessDayLag { days: 2 }
            .resolve(&reference)
            .unwrap();
        assert_eq!(date.date(), ymd(2024, 1, 15));
    }

    #[test]
    fn test_display() {
        let date = AnnouncedDate::new(ymd(2024, 1, 16));
        assert_eq!(date.to_string(), "2024-01-16 (Tue)");
        assert_eq!(AnnouncementPolicy::default().to_string(), "evening-cutoff");
        assert_eq!(
            AnnouncementPolicy::BusinessDayLag { days: 2 }.to_string(),
            "business-day-lag(2)"
        );
    }
}
