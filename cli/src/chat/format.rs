//! Reply formatting for lookup results.

use super::state::PlanRecord;
use crate::api::InvestedPlanRow;
use crate::calendar::{parse_timestamp, UNKNOWN_DATE};
use chrono::NaiveDateTime;
use std::fmt::Write;

pub const UNKNOWN: &str = UNKNOWN_DATE;

/// `done`/`pending`/`in_progress` get Persian labels; other values pass
/// through untouched and a missing status reads as unknown.
pub fn map_status_to_persian(status: Option<&str>) -> String {
    match status {
        Some("done") => "انجام شده".to_string(),
        Some("pending") => "در انتظار".to_string(),
        Some("in_progress") => "در حال انجام".to_string(),
        Some(other) if !other.is_empty() => other.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// A plan phase whose start date has already been converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseView {
    pub title: String,
    pub solar_date: String,
    pub percent: String,
    pub status: Option<String>,
}

/// A timeline row with its start date converted. The Gregorian original
/// is kept for ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineView {
    pub plan_id: Option<String>,
    pub start_date: Option<String>,
    pub title: String,
    pub solar_date: String,
    pub percent: String,
    pub status: Option<String>,
}

pub fn format_invested_plans(rows: &[InvestedPlanRow]) -> String {
    let first = rows.first();
    let first_name = first
        .and_then(|r| r.first_name.as_deref())
        .unwrap_or("کاربر");
    let last_name = first.and_then(|r| r.last_name.as_deref()).unwrap_or("عزیز");

    let mut message = format!(
        "{} {} عزیز شما تا الان روی طرح های زیر سرمایه گذاری کرده اید:\n\n",
        first_name, last_name
    );
    for row in rows {
        let _ = write!(
            message,
            "🟠 نام طرح: {}\n🔸 نماد طرح: {}\n🔸 مبلغ سرمایه گذاری شما: {} تومان\n\n",
            row.plan_title.as_deref().unwrap_or(UNKNOWN),
            row.plan_symbol.as_deref().unwrap_or(UNKNOWN),
            row.amount.as_deref().unwrap_or(UNKNOWN),
        );
    }
    message.push_str("جهت بررسی اطلاعات هر طرح روی آن کلیک کنید");
    message
}

pub fn format_plan_phases(phases: &[PhaseView]) -> String {
    if phases.is_empty() {
        return "هیچ مرحله‌ای برای این طرح یافت نشد.".to_string();
    }

    let mut message = String::from("جزئیات پرداخت سود طرح:\n\n");
    for phase in phases {
        let _ = write!(
            message,
            "⚪️ {}\n▪️ تاریخ: {}\n▪️ میزان سود: {} درصد\n▪️ وضعیت: {}\n\n",
            phase.title,
            phase.solar_date,
            phase.percent,
            map_status_to_persian(phase.status.as_deref()),
        );
    }
    message.push_str("اگر تاریخ واریز سودتان امروز است پرداختتان در حال پردازش است و چون شبا میشود طی ۲۴ ساعت آینده به حسابتان واریز خواهد شد.\n");
    message.push_str("جهت بررسی جزئیات تراکنش هر مرحله سود روی آن کلیک کنید");
    message
}

pub fn plan_loading_notice(symbol: &str) -> String {
    format!("📋 اطلاعات طرح {}:\n\n🔍 در حال بارگذاری جزئیات...", symbol)
}

pub fn phase_details_placeholder(title: &str) -> String {
    format!("📋 جزئیات {}:\n\n🔍 در حال بارگذاری جزئیات تراکنش...", title)
}

pub fn link_choice_echo(label: &str) -> String {
    format!("انتخاب: {}", label)
}

pub fn link_opened(label: &str) -> String {
    format!("لینک {} در تب جدید باز شد.", label)
}

/// Orders rows by start timestamp, oldest first. Rows without a readable
/// `start_date` count as the oldest possible moment; ties keep input order.
pub fn sort_timeline(rows: &mut [TimelineView]) {
    rows.sort_by_key(|row| {
        row.start_date
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(NaiveDateTime::MIN)
    });
}

/// Display symbol of a cached plan, matched on plan id.
pub fn resolve_symbol(plan_id: Option<&str>, records: &[PlanRecord]) -> String {
    plan_id
        .and_then(|id| records.iter().find(|record| record.plan_id == id))
        .map(|record| record.symbol.clone())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn format_timeline(entries: &[TimelineView], records: &[PlanRecord]) -> String {
    let mut message = String::from("📅 زمان‌بندی واریز سودها:\n\n");
    for entry in entries {
        let icon = if entry.status.as_deref() == Some("done") {
            "✅"
        } else {
            "🟦"
        };
        let _ = write!(
            message,
            "{} {}\n🔹 {} / {}\n🔹 میزان سود: {} درصد از کل مبلغ سرمایه گذاری\n🔹 وضعیت: {}\n\n",
            icon,
            entry.solar_date,
            entry.title,
            resolve_symbol(entry.plan_id.as_deref(), records),
            entry.percent,
            map_status_to_persian(entry.status.as_deref()),
        );
    }
    message
}

/// Replaces ASCII digits with Persian ones.
pub fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => char::from_u32('۰' as u32 + d).unwrap_or(c),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("done"), "انجام شده")]
    #[case(Some("pending"), "در انتظار")]
    #[case(Some("in_progress"), "در حال انجام")]
    #[case(Some("cancelled"), "cancelled")]
    #[case(Some(""), UNKNOWN)]
    #[case(None, UNKNOWN)]
    fn status_labels(#[case] status: Option<&str>, #[case] expected: &str) {
        assert_eq!(map_status_to_persian(status), expected);
    }

    fn timeline_row(plan_id: &str, start_date: Option<&str>) -> TimelineView {
        TimelineView {
            plan_id: Some(plan_id.to_string()),
            start_date: start_date.map(str::to_string),
            ..TimelineView::default()
        }
    }

    #[test]
    fn timeline_sorts_ascending_with_missing_dates_first() {
        let mut rows = vec![
            timeline_row("a", Some("2024-06-01")),
            timeline_row("b", None),
            timeline_row("c", Some("2023-01-01T00:00:00Z")),
            timeline_row("d", Some("garbage")),
            timeline_row("e", Some("2024-01-15")),
        ];
        sort_timeline(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.plan_id.as_deref().unwrap()).collect();
        assert_eq!(order, vec!["b", "d", "c", "e", "a"]);
    }

    #[test]
    fn same_day_rows_order_by_time() {
        let mut rows = vec![
            timeline_row("late", Some("2024-01-15T18:00:00Z")),
            timeline_row("midnight", Some("2024-01-15")),
            timeline_row("early", Some("2024-01-15 08:15:00")),
        ];
        sort_timeline(&mut rows);

        let order: Vec<&str> = rows.iter().map(|r| r.plan_id.as_deref().unwrap()).collect();
        assert_eq!(order, vec!["midnight", "early", "late"]);
    }

    #[test]
    fn invested_plans_summary_lists_every_row() {
        let rows = vec![
            InvestedPlanRow {
                first_name: Some("Sara".into()),
                last_name: Some("Ahmadi".into()),
                plan_title: Some("Saffron".into()),
                plan_symbol: Some("زعفران".into()),
                amount: Some("1000".into()),
                ..InvestedPlanRow::default()
            },
            InvestedPlanRow {
                plan_title: Some("Dates".into()),
                ..InvestedPlanRow::default()
            },
        ];
        let message = format_invested_plans(&rows);

        assert!(message.starts_with("Sara Ahmadi عزیز"));
        assert!(message.contains("🟠 نام طرح: Saffron"));
        assert!(message.contains("🔸 مبلغ سرمایه گذاری شما: 1000 تومان"));
        assert!(message.contains(&format!("🔸 نماد طرح: {}", UNKNOWN)));
    }

    #[test]
    fn missing_names_fall_back_to_generic_greeting() {
        let message = format_invested_plans(&[InvestedPlanRow::default()]);
        assert!(message.starts_with("کاربر عزیز عزیز"));
    }

    #[test]
    fn phases_message_includes_converted_dates() {
        let phases = vec![PhaseView {
            title: "مرحله اول".into(),
            solar_date: "1403/01/15".into(),
            percent: "10".into(),
            status: Some("done".into()),
        }];
        let message = format_plan_phases(&phases);

        assert!(message.contains("⚪️ مرحله اول\n▪️ تاریخ: 1403/01/15\n▪️ میزان سود: 10 درصد\n▪️ وضعیت: انجام شده"));
    }

    #[test]
    fn timeline_resolves_symbols_and_icons() {
        let records = vec![PlanRecord {
            plan_id: "7".into(),
            title: "Saffron".into(),
            symbol: "زعفران".into(),
            invested_amount: None,
        }];
        let entries = vec![
            TimelineView {
                plan_id: Some("7".into()),
                start_date: Some("2024-04-03".into()),
                title: "سود اول".into(),
                solar_date: "1403/01/15".into(),
                percent: "5".into(),
                status: Some("done".into()),
            },
            TimelineView {
                plan_id: Some("8".into()),
                start_date: Some("2024-07-05".into()),
                title: "سود دوم".into(),
                solar_date: "1403/04/15".into(),
                percent: "5".into(),
                status: Some("pending".into()),
            },
        ];
        let message = format_timeline(&entries, &records);

        assert!(message.contains("✅ 1403/01/15\n🔹 سود اول / زعفران"));
        assert!(message.contains(&format!("🟦 1403/04/15\n🔹 سود دوم / {}", UNKNOWN)));
    }

    #[test]
    fn persian_digits() {
        assert_eq!(to_persian_digits("14:05"), "۱۴:۰۵");
    }
}
