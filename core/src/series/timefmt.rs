//! Calendar fields to epoch seconds (UTC).

use chrono::NaiveDate;

/// Two-digit years below 62 belong to the 2000s.
pub fn fix_two_digit_year(year: i32) -> i32 {
    match year {
        y if y < 62 => y + 2000,
        y if y < 100 => y + 1900,
        y => y,
    }
}

fn midnight(date: NaiveDate) -> Option<f64> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64)
}

pub fn epoch_from_calendar(
    year: i32,
    month: u32,
    day: u32,
    hour: f64,
    minute: f64,
    seconds: f64,
) -> Option<f64> {
    let date = NaiveDate::from_ymd_opt(fix_two_digit_year(year), month, day)?;
    Some(midnight(date)? + hour * 3600.0 + minute * 60.0 + seconds)
}

/// `minute` may exceed 59, which covers minute-of-day layouts.
pub fn epoch_from_day_of_year(
    year: i32,
    day_of_year: u32,
    hour: f64,
    minute: f64,
    seconds: f64,
) -> Option<f64> {
    let date = NaiveDate::from_yo_opt(fix_two_digit_year(year), day_of_year)?;
    Some(midnight(date)? + hour * 3600.0 + minute * 60.0 + seconds)
}

/// Leading time columns of the numbered text layouts.
///
/// * 1: `epoch`
/// * 2: `year month day hour minute second`
/// * 3: `year jday hour minute second`
/// * 4: `year jday minute_of_day second`
///
/// Returns the epoch time and the number of fields consumed.
pub fn parse_time_prefix(fields: &[&str], format: i32) -> Option<(f64, usize)> {
    let num = |index: usize| fields.get(index)?.parse::<f64>().ok();
    let int = |index: usize| fields.get(index)?.parse::<i32>().ok();
    match format {
        1 => Some((num(0)?, 1)),
        2 => {
            let time = epoch_from_calendar(
                int(0)?,
                u32::try_from(int(1)?).ok()?,
                u32::try_from(int(2)?).ok()?,
                num(3)?,
                num(4)?,
                num(5)?,
            )?;
            Some((time, 6))
        }
        3 => {
            let time = epoch_from_day_of_year(
                int(0)?,
                u32::try_from(int(1)?).ok()?,
                num(2)?,
                num(3)?,
                num(4)?,
            )?;
            Some((time, 5))
        }
        4 => {
            let time =
                epoch_from_day_of_year(int(0)?, u32::try_from(int(1)?).ok()?, 0.0, num(2)?, num(3)?)?;
            Some((time, 4))
        }
        _ => None,
    }
}
