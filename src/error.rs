//! Ошибки чтения, нормализации и агрегации журнала сделок.

/// Ошибка разбора журнала сделок или расчёта сводки.
#[derive(thiserror::Error, Debug)]
pub enum SummaryError {
    /// Ошибка ввода-вывода при чтении исходного файла.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Ошибка разбора CSV.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    /// Ошибка разбора JSON-запроса.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    /// В таблице отсутствует обязательный столбец.
    #[error("Required field '{field}' missing")]
    Schema {
        /// Каноническое имя пропавшего поля.
        field: &'static str,
    },
    /// Ставка налога вне диапазона `[0, 1]`.
    #[error("Tax rate '{value}' is outside of [0, 1]")]
    TaxRate {
        /// Некорректное значение ставки.
        value: String,
    },
    /// Ошибка разбора даты.
    #[error("Invalid date '{value}'")]
    Date {
        /// Некорректная дата.
        value: String,
    },
    /// Сумма вышла за пределы `Decimal`.
    #[error("Amount overflow while summing '{group}'")]
    Overflow {
        /// Группа (стратегия, месяц или день), на которой произошло переполнение.
        group: String,
    },
}

impl SummaryError {
    pub(crate) fn overflow(group: &str) -> Self {
        Self::Overflow {
            group: group.to_string(),
        }
    }
}
