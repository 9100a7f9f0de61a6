//! Вспомогательные парсеры чисел, дат и имён столбцов.

use crate::types::Money;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static ACCOUNTING_NEGATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\((.*)\)$").expect("valid accounting regex"));

// Двузначный год проверяется раньше четырёхзначного: `%Y` принимает и "24".
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Приводит заголовок к каноническому виду: без краевых пробелов,
/// в нижнем регистре, группы пробельных символов заменены на `_`.
pub fn normalize_header(header: &str) -> String {
    WHITESPACE_RE
        .replace_all(header.trim(), "_")
        .to_lowercase()
}

/// Нормализует числовую строку, удаляя пробелы, знак валюты,
/// разделители тысяч и знак плюса.
fn normalize_number(input: &str) -> String {
    let trimmed = input.trim();
    let (negative, body) = match ACCOUNTING_NEGATIVE_RE.captures(trimmed) {
        Some(caps) => (true, caps.get(1).map_or("", |m| m.as_str())),
        None => (false, trimmed),
    };
    let digits: String = body
        .chars()
        .filter(|ch| !matches!(*ch, ' ' | '\u{a0}' | '\u{202f}' | '+' | '$' | ','))
        .collect();
    if negative && !digits.is_empty() {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Разбирает денежное значение. Пустая ячейка даёт `Some(0)`,
/// нераспознанная строка даёт `None`.
pub fn parse_money(value: &str) -> Option<Money> {
    let normalized = normalize_number(value);
    if normalized.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Разбирает количество контрактов. Пустая ячейка даёт `Some(0)`.
pub fn parse_count(value: &str) -> Option<u32> {
    let normalized = normalize_number(value);
    if normalized.is_empty() {
        return Some(0);
    }
    normalized.parse().ok()
}

/// Разбирает дату в одном из распространённых форматов выгрузок.
/// Время, если оно есть, отбрасывается.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
