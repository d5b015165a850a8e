//! `WorldTime.GetCityTime`: local wall-clock time for a fixed set of cities.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use serde_json::Value;
use warden_core::ToolError;

use super::{single_string_argument, Tool, ToolDescriptor, ValidatedArguments, WORLD_TIME};

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedTime(pub DateTime<Utc>);

impl TimeSource for FixedTime {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DaylightRule {
    None,
    /// Last Sunday of March to last Sunday of October, 01:00 UTC.
    European,
    /// Second Sunday of March to first Sunday of November, 02:00 local.
    NorthAmerican,
    /// First Sunday of October to first Sunday of April, 02:00 local standard.
    Australian,
}

#[derive(Debug)]
struct City {
    name: &'static str,
    aliases: &'static [&'static str],
    zone: &'static str,
    standard_offset_minutes: i32,
    daylight: DaylightRule,
}

const fn city(
    name: &'static str,
    aliases: &'static [&'static str],
    zone: &'static str,
    standard_offset_minutes: i32,
    daylight: DaylightRule,
) -> City {
    City { name, aliases, zone, standard_offset_minutes, daylight }
}

const CITIES: &[City] = &[
    city("Amsterdam", &[], "Europe/Amsterdam", 60, DaylightRule::European),
    city("Athens", &[], "Europe/Athens", 120, DaylightRule::European),
    city("Bangalore", &["bengaluru"], "Asia/Kolkata", 330, DaylightRule::None),
    city("Beijing", &[], "Asia/Shanghai", 480, DaylightRule::None),
    city("Berlin", &[], "Europe/Berlin", 60, DaylightRule::European),
    city("Buenos Aires", &[], "America/Argentina/Buenos_Aires", -180, DaylightRule::None),
    city("Chicago", &[], "America/Chicago", -360, DaylightRule::NorthAmerican),
    city("Delhi", &["new delhi"], "Asia/Kolkata", 330, DaylightRule::None),
    city("Denver", &[], "America/Denver", -420, DaylightRule::NorthAmerican),
    city("Dubai", &[], "Asia/Dubai", 240, DaylightRule::None),
    city("Dublin", &[], "Europe/Dublin", 0, DaylightRule::European),
    city("Helsinki", &[], "Europe/Helsinki", 120, DaylightRule::European),
    city("Hong Kong", &[], "Asia/Hong_Kong", 480, DaylightRule::None),
    city("Istanbul", &[], "Europe/Istanbul", 180, DaylightRule::None),
    city("Johannesburg", &[], "Africa/Johannesburg", 120, DaylightRule::None),
    city("Lagos", &[], "Africa/Lagos", 60, DaylightRule::None),
    city("Lisbon", &[], "Europe/Lisbon", 0, DaylightRule::European),
    city("London", &[], "Europe/London", 0, DaylightRule::European),
    city("Los Angeles", &["la"], "America/Los_Angeles", -480, DaylightRule::NorthAmerican),
    city("Madrid", &[], "Europe/Madrid", 60, DaylightRule::European),
    city("Melbourne", &[], "Australia/Melbourne", 600, DaylightRule::Australian),
    city("Mexico City", &[], "America/Mexico_City", -360, DaylightRule::None),
    city("Moscow", &[], "Europe/Moscow", 180, DaylightRule::None),
    city("Mumbai", &["bombay"], "Asia/Kolkata", 330, DaylightRule::None),
    city("Nairobi", &[], "Africa/Nairobi", 180, DaylightRule::None),
    city("New York", &["nyc", "new york city"], "America/New_York", -300, DaylightRule::NorthAmerican),
    city("Paris", &[], "Europe/Paris", 60, DaylightRule::European),
    city("Phoenix", &[], "America/Phoenix", -420, DaylightRule::None),
    city("Rome", &[], "Europe/Rome", 60, DaylightRule::European),
    city("San Francisco", &["sf"], "America/Los_Angeles", -480, DaylightRule::NorthAmerican),
    city("Sao Paulo", &["são paulo"], "America/Sao_Paulo", -180, DaylightRule::None),
    city("Seoul", &[], "Asia/Seoul", 540, DaylightRule::None),
    city("Shanghai", &[], "Asia/Shanghai", 480, DaylightRule::None),
    city("Singapore", &[], "Asia/Singapore", 480, DaylightRule::None),
    city("Stockholm", &[], "Europe/Stockholm", 60, DaylightRule::European),
    city("Sydney", &[], "Australia/Sydney", 600, DaylightRule::Australian),
    city("Tokyo", &[], "Asia/Tokyo", 540, DaylightRule::None),
    city("Toronto", &[], "America/Toronto", -300, DaylightRule::NorthAmerican),
    city("Vancouver", &[], "America/Vancouver", -480, DaylightRule::NorthAmerican),
    city("Warsaw", &[], "Europe/Warsaw", 60, DaylightRule::European),
];

fn normalize(city: &str) -> String {
    let head = city.split(',').next().unwrap_or_default();
    head.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn find_city(query: &str) -> Option<&'static City> {
    let wanted = normalize(query);
    CITIES.iter().find(|city| {
        city.name.to_lowercase() == wanted || city.aliases.iter().any(|alias| *alias == wanted)
    })
}

fn unknown_city() -> ToolError {
    let names = CITIES.iter().map(|city| city.name).collect::<Vec<_>>().join(", ");
    ToolError::InvalidArgument(format!("Unknown city. Supported cities: {names}."))
}

/// UTC instant of `hour`:00 local standard time on `date`.
fn at_local_standard(date: NaiveDate, hour: u32, offset_minutes: i32) -> Option<DateTime<Utc>> {
    let local = date.and_hms_opt(hour, 0, 0)?;
    Some(Utc.from_utc_datetime(&(local - Duration::minutes(i64::from(offset_minutes)))))
}

fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let last_day = NaiveDate::from_ymd_opt(year, month + 1, 1)?.pred_opt()?;
    let back = u64::from(last_day.weekday().num_days_from_sunday());
    last_day.checked_sub_days(Days::new(back))
}

fn nth_sunday(year: i32, month: u32, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, n)
}

fn daylight_active(city: &City, now: DateTime<Utc>) -> bool {
    let year = now.year();
    let offset = city.standard_offset_minutes;
    let window = match city.daylight {
        DaylightRule::None => return false,
        DaylightRule::European => (
            last_sunday(year, 3).and_then(|day| at_local_standard(day, 1, 0)),
            last_sunday(year, 10).and_then(|day| at_local_standard(day, 1, 0)),
        ),
        DaylightRule::NorthAmerican => (
            nth_sunday(year, 3, 2).and_then(|day| at_local_standard(day, 2, offset)),
            nth_sunday(year, 11, 1).and_then(|day| at_local_standard(day, 1, offset)),
        ),
        DaylightRule::Australian => {
            // Southern hemisphere: daylight time spans the new year.
            let ends = nth_sunday(year, 4, 1).and_then(|day| at_local_standard(day, 2, offset));
            let starts = nth_sunday(year, 10, 1).and_then(|day| at_local_standard(day, 2, offset));
            return match (ends, starts) {
                (Some(ends), Some(starts)) => now < ends || now >= starts,
                _ => false,
            };
        }
    };

    match window {
        (Some(starts), Some(ends)) => now >= starts && now < ends,
        _ => false,
    }
}

fn describe_time(city: &City, now: DateTime<Utc>) -> Result<String, ToolError> {
    let mut offset_minutes = city.standard_offset_minutes;
    if daylight_active(city, now) {
        offset_minutes += 60;
    }
    let offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
        ToolError::ExecutionFailed(format!("offset {offset_minutes}m out of range"))
    })?;
    let local = now.with_timezone(&offset);

    Ok(format!(
        "Current time in {} ({}): {} (UTC{})",
        city.name,
        city.zone,
        local.format("%Y-%m-%d %H:%M"),
        local.format("%:z")
    ))
}

pub struct WorldClockTool {
    time: Arc<dyn TimeSource>,
}

impl WorldClockTool {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self { time }
    }

    pub fn supported_cities() -> impl Iterator<Item = &'static str> {
        CITIES.iter().map(|city| city.name)
    }
}

#[async_trait]
impl Tool for WorldClockTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        &WORLD_TIME
    }

    fn validate(&self, arguments: Option<&Value>) -> Result<ValidatedArguments, ToolError> {
        let validated = single_string_argument(&WORLD_TIME, arguments)?;
        let known = validated.get(WORLD_TIME.argument).and_then(find_city).is_some();
        if !known {
            return Err(unknown_city());
        }
        Ok(validated)
    }

    async fn run(&self, arguments: ValidatedArguments) -> Result<String, ToolError> {
        let city = arguments.get(WORLD_TIME.argument).and_then(find_city).ok_or_else(unknown_city)?;
        describe_time(city, self.time.now())
    }
}
