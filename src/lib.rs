#![warn(missing_docs)]
//! Библиотека для агрегации журнала опционных сделок по стратегиям:
//! нормализация столбцов, фильтр по датам, комиссии и налог на итог.

mod aggregate;
mod api;
mod calc;
mod error;
mod filter;
mod normalize;
mod raw;
mod summary;
mod types;
mod utils;

pub use crate::aggregate::{SortOrder, aggregate, cumulative, monthly, sort_rows};
pub use crate::api::{CalcRequest, CalcResponse};
pub use crate::calc::{FeeSchedule, TaxRate, commission_total, profit_after_commissions};
pub use crate::error::SummaryError;
pub use crate::filter::{DateRange, filter_by_date, filter_by_strategy};
pub use crate::normalize::{COLUMN_ALIASES, Field, normalize, resolve_header};
pub use crate::raw::RawTable;
pub use crate::summary::{Summary, SummaryBuilder};
pub use crate::types::*;
pub use crate::utils::{normalize_header, parse_date, parse_money};
