use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Operations every company counts unless configured otherwise.
pub const DEFAULT_OPERATIONS: [&str; 9] = [
    "Комплектация",
    "Размиксовка",
    "Уборка Холод",
    "Уборка Сухой",
    "Пресс",
    "Уборка Паллет",
    "Отгрузка паллет",
    "Подвоз РК",
    "Замотка РК",
];

/// Companies created on first start.
pub const DEFAULT_COMPANIES: [&str; 4] = ["Мувинг", "ЭСК", "Градусы", "2колеса"];

/// Which half of the day the floor is working.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    /// 10:00 through 21:00.
    Day,
    /// 22:00 through 09:00 of the next morning.
    Night,
}

impl Shift {
    /// Shift whose schedule should be displayed at wall-clock time `now`.
    ///
    /// The switch happens a quarter past the last hour so the final slot of
    /// the outgoing shift can still be filled in.
    pub fn at(now: NaiveTime) -> Shift {
        const DAY_STARTS: u32 = 9 * 60 + 15;
        const NIGHT_STARTS: u32 = 21 * 60 + 15;
        let minute_of_day = now.hour() * 60 + now.minute();
        if (DAY_STARTS..NIGHT_STARTS).contains(&minute_of_day) {
            Shift::Day
        } else {
            Shift::Night
        }
    }

    /// Calendar date of the shift running at `moment`, which may be an hour
    /// slot or a wall-clock time. Night hours before noon belong to the
    /// shift that started the previous evening.
    pub fn start_date(moment: NaiveDateTime) -> NaiveDate {
        let date = moment.date();
        if Shift::at(moment.time()) == Shift::Night && moment.hour() < 12 {
            date.pred_opt().unwrap_or(date)
        } else {
            date
        }
    }

    /// Clock hours of the shift in display order.
    pub fn hours(self) -> Vec<u32> {
        match self {
            Shift::Day => (10..=21).collect(),
            Shift::Night => (22..=23).chain(0..=9).collect(),
        }
    }

    /// Hour slots of the shift that starts on `date`. Night hours after
    /// midnight fall on the following calendar day.
    pub fn slots(self, date: NaiveDate) -> Vec<NaiveDateTime> {
        self.hours()
            .into_iter()
            .filter_map(|hour| {
                let day = if self == Shift::Night && hour < 12 {
                    date.succ_opt()?
                } else {
                    date
                };
                day.and_hms_opt(hour, 0, 0)
            })
            .collect()
    }
}

/// Parses an hour slot such as `2024-05-01 10:00:00`, `2024-05-01T10:00`
/// or `2024-05-01 10:37:12`, truncating it to the whole hour.
pub fn parse_hour_slot(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.trim().replacen('T', " ", 1);
    let parsed = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M"))
        .ok()?;
    parsed.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

/// One counter cell: how many operations a company performed in an hour.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct HourlyData {
    pub id: i32,
    pub company_id: i32,
    pub company_name: String,
    pub operation_type: String,
    pub hour: NaiveDateTime,
    pub value: i32,
}

/// Upsert payload for a single counter cell.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct HourlyInput {
    pub company_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub operation_type: String,
    pub hour: String,
    #[serde(default)]
    pub value: i32,
}

impl HourlyInput {
    pub fn hour_slot(&self) -> Option<NaiveDateTime> {
        parse_hour_slot(&self.hour)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkHourlyInput {
    #[validate]
    pub updates: Vec<HourlyInput>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyQuery {
    pub company_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OperationInput {
    #[validate(length(min = 1, max = 100, message = "Operation type required"))]
    pub operation_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_shift_switches_at_quarter_past() {
        assert_eq!(Shift::at(time(9, 14)), Shift::Night);
        assert_eq!(Shift::at(time(9, 15)), Shift::Day);
        assert_eq!(Shift::at(time(21, 14)), Shift::Day);
        assert_eq!(Shift::at(time(21, 15)), Shift::Night);
        assert_eq!(Shift::at(time(3, 0)), Shift::Night);
    }

    #[test]
    fn test_shift_hours() {
        assert_eq!(Shift::Day.hours().first(), Some(&10));
        assert_eq!(Shift::Day.hours().len(), 12);
        assert_eq!(
            Shift::Night.hours(),
            vec![22, 23, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]
        );
    }

    #[test]
    fn test_night_slots_roll_over_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let slots = Shift::Night.slots(date);
        assert_eq!(slots[0].to_string(), "2024-12-31 22:00:00");
        assert_eq!(slots[2].to_string(), "2025-01-01 00:00:00");
        assert_eq!(slots[11].to_string(), "2025-01-01 09:00:00");
    }

    #[test]
    fn test_start_date_of_night_slots() {
        let at = |d: u32, h: u32, m: u32| {
            NaiveDate::from_ymd_opt(2024, 5, d)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };
        let may_1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert_eq!(Shift::start_date(at(1, 10, 0)), may_1);
        assert_eq!(Shift::start_date(at(1, 22, 0)), may_1);
        assert_eq!(Shift::start_date(at(1, 23, 30)), may_1);
        assert_eq!(Shift::start_date(at(2, 0, 0)), may_1);
        assert_eq!(Shift::start_date(at(2, 9, 0)), may_1);
        assert_eq!(Shift::start_date(at(2, 9, 14)), may_1);
        assert_eq!(Shift::start_date(at(2, 9, 15)), may_1.succ_opt().unwrap());

        // Every slot of a night shift maps back to the day it started.
        for slot in Shift::Night.slots(may_1) {
            assert_eq!(Shift::start_date(slot), may_1, "{}", slot);
        }
    }

    #[test]
    fn test_parse_hour_slot() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_hour_slot("2024-05-01 10:00:00"), Some(expected));
        assert_eq!(parse_hour_slot("2024-05-01T10:00"), Some(expected));
        assert_eq!(parse_hour_slot(" 2024-05-01 10:37:12 "), Some(expected));
        assert_eq!(parse_hour_slot("10:00"), None);
        assert_eq!(parse_hour_slot("2024-13-01 10:00:00"), None);
    }
}
