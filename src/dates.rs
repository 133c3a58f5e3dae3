//! Per-source timestamp parsing.
//!
//! Each source owns exactly one [`DateFormat`]. Naive site timestamps are
//! pinned to the site's UTC offset so they compare correctly against the
//! run's reference clock.

use crate::error::CrawlError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

pub const UTC: i32 = 0;
/// Korea Standard Time, used by the Korean outlets and forum.
pub const KST: i32 = 9 * 3600;

/// One source's timestamp rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// Milliseconds since the Unix epoch, e.g. a `data-time` attribute.
    EpochMillis { offset_secs: i32 },
    /// ISO-8601 / RFC 3339. Values without an offset are taken at `offset_secs`.
    Iso8601 { offset_secs: i32 },
    /// A `chrono` pattern carrying date and time.
    DateTime {
        pattern: &'static str,
        offset_secs: i32,
    },
    /// A `chrono` pattern carrying only a date; taken at local midnight.
    Date {
        pattern: &'static str,
        offset_secs: i32,
    },
}

impl DateFormat {
    /// Parse `raw` (already stripped of any source-specific label).
    pub fn parse(&self, raw: &str) -> Result<DateTime<FixedOffset>, CrawlError> {
        let raw = raw.trim();
        match *self {
            DateFormat::EpochMillis { offset_secs } => {
                let millis: i64 = raw
                    .parse()
                    .map_err(|e| CrawlError::date_parse(raw, e))?;
                let utc = DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| CrawlError::date_parse(raw, "timestamp out of range"))?;
                Ok(utc.with_timezone(&offset(offset_secs, raw)?))
            }
            DateFormat::Iso8601 { offset_secs } => DateTime::parse_from_rfc3339(raw)
                .or_else(|_| {
                    // bare local timestamps, with or without fractional seconds
                    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                        .map_err(|e| CrawlError::date_parse(raw, e))
                        .and_then(|naive| pin(naive, offset_secs, raw))
                }),
            DateFormat::DateTime {
                pattern,
                offset_secs,
            } => NaiveDateTime::parse_from_str(raw, pattern)
                .map_err(|e| CrawlError::date_parse(raw, e))
                .and_then(|naive| pin(naive, offset_secs, raw)),
            DateFormat::Date {
                pattern,
                offset_secs,
            } => {
                let date = NaiveDate::parse_from_str(raw, pattern)
                    .map_err(|e| CrawlError::date_parse(raw, e))?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| CrawlError::date_parse(raw, "invalid midnight"))?;
                pin(midnight, offset_secs, raw)
            }
        }
    }
}

fn offset(offset_secs: i32, raw: &str) -> Result<FixedOffset, CrawlError> {
    FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| CrawlError::date_parse(raw, format!("bad UTC offset {offset_secs}")))
}

fn pin(
    naive: NaiveDateTime,
    offset_secs: i32,
    raw: &str,
) -> Result<DateTime<FixedOffset>, CrawlError> {
    offset(offset_secs, raw)?
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| CrawlError::date_parse(raw, "ambiguous local time"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis() {
        let fmt = DateFormat::EpochMillis { offset_secs: KST };
        // 2026-10-17T15:30:00Z
        let parsed = fmt.parse("1792251000000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-18T00:30:00+09:00");
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2026-10-18");
    }

    #[test]
    fn test_epoch_millis_rejects_garbage() {
        let fmt = DateFormat::EpochMillis { offset_secs: UTC };
        assert!(matches!(
            fmt.parse("yesterday"),
            Err(CrawlError::DateParse { .. })
        ));
    }

    #[test]
    fn test_iso_with_and_without_offset() {
        let fmt = DateFormat::Iso8601 { offset_secs: UTC };
        let aware = fmt.parse("2026-10-16T10:15:00-07:00").unwrap();
        assert_eq!(aware.offset().local_minus_utc(), -7 * 3600);
        let naive = fmt.parse("2026-10-16T10:15:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2026-10-16T10:15:00+00:00");
    }

    #[test]
    fn test_month_name_date() {
        let fmt = DateFormat::Date {
            pattern: "%b %d, %Y",
            offset_secs: UTC,
        };
        let parsed = fmt.parse(" Oct 15, 2026 ").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-15T00:00:00+00:00");
        assert!(fmt.parse("Published on Oct 15, 2026").is_err());
    }

    #[test]
    fn test_dotted_datetime_in_kst() {
        let fmt = DateFormat::DateTime {
            pattern: "%Y.%m.%d %H:%M",
            offset_secs: KST,
        };
        let parsed = fmt.parse("2026.10.17 14:05").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-10-17T14:05:00+09:00");
    }

    #[test]
    fn test_full_month_name() {
        let fmt = DateFormat::Date {
            pattern: "%d %B, %Y",
            offset_secs: UTC,
        };
        assert_eq!(
            fmt.parse("14 October, 2026").unwrap().format("%Y-%m-%d").to_string(),
            "2026-10-14"
        );
    }
}
