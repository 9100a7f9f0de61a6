//! CLI: читает журнал сделок и печатает сводку по стратегиям.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;
use trade_log_summary::{
    CalcRequest, CalcResponse, CumulativePl, DateRange, FeeSchedule, MonthlyPl, RawTable,
    SortOrder, Summary, SummaryBuilder, TaxRate, TradeLog, normalize,
};

#[derive(Parser)]
#[command(
    name = "trade-log-summary",
    about = "Сводка журнала опционных сделок по стратегиям"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Считает сводку по CSV-журналу.
    Summarize(SummarizeArgs),
    /// Выполняет JSON-запрос на расчёт и печатает JSON-ответ.
    Request {
        /// Путь к JSON-файлу запроса.
        path: PathBuf,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct SummarizeArgs {
    /// Путь к CSV-файлу журнала.
    path: PathBuf,

    /// Ставка налога в процентах.
    #[arg(long, default_value = "30")]
    tax_percent: Decimal,

    /// Начало интервала дат. По умолчанию первая дата журнала.
    #[arg(long)]
    start: Option<String>,

    /// Конец интервала дат. По умолчанию последняя дата журнала.
    #[arg(long)]
    end: Option<String>,

    /// Учитывать только эти стратегии (можно повторять).
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// Порядок строк.
    #[arg(long, value_enum, default_value_t = SortArg::Strategy)]
    sort: SortArg,

    /// Оценивать комиссии по тарифу, если в журнале нет их столбцов.
    #[arg(long, default_value_t = false)]
    estimate_fees: bool,

    /// Комиссия за контракт на одной стороне сделки.
    #[arg(long, default_value = "0.50", requires = "estimate_fees")]
    fee_per_contract: Decimal,

    /// Фиксированный сбор на одной стороне сделки.
    #[arg(long, default_value = "0.57", requires = "estimate_fees")]
    regulatory_fee: Decimal,

    /// Печатать JSON вместо таблицы.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Добавить помесячную разбивку.
    #[arg(long, default_value_t = false)]
    monthly: bool,

    /// Добавить накопленный результат по дням.
    #[arg(long, default_value_t = false)]
    cumulative: bool,

    /// Сохранить отобранные сделки в CSV.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Strategy,
    Net,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Strategy => Self::Strategy,
            SortArg::Net => Self::NetPlDesc,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Summarize(args) => run_summarize(args),
        Commands::Request { path } => run_request(&path),
    }
}

fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let file = File::open(&args.path)
        .with_context(|| format!("cannot open {}", args.path.display()))?;
    let raw = RawTable::from_reader(file)?;
    let log = normalize(&raw)?;
    let tax_rate = TaxRate::from_percent(args.tax_percent)?;
    let date_range = resolve_range(&log, args.start.as_deref(), args.end.as_deref())?;
    let fee_schedule = args.estimate_fees.then_some(FeeSchedule {
        per_contract: args.fee_per_contract,
        regulatory: args.regulatory_fee,
    });

    let builder = SummaryBuilder::new(&log)
        .tax_rate(tax_rate)
        .date_range(date_range)
        .strategies(args.strategies)
        .sort(args.sort.into())
        .fee_schedule(fee_schedule);
    let summary = builder.build()?;
    let months = args.monthly.then(|| builder.monthly()).transpose()?;
    let points = args.cumulative.then(|| builder.cumulative()).transpose()?;

    if let Some(path) = &args.export {
        let csv = builder.selected_log()?.to_raw().to_csv_string()?;
        std::fs::write(path, csv).with_context(|| format!("cannot write {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported selected trades");
    }

    if args.json {
        let response = CalcResponse::from(summary);
        let mut value = serde_json::to_value(&response)?;
        if let Some(months) = months {
            value["monthly"] = serde_json::to_value(months)?;
        }
        if let Some(points) = points {
            value["cumulative"] = serde_json::to_value(points)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        if let Some((first, last)) = log.date_span() {
            println!(
                "Журнал: {} сделок, {} - {} ({})",
                log.records.len(),
                first,
                last,
                log.date_field.column()
            );
        }
        if !log.warnings.is_empty() {
            println!("Неразобранных ячеек: {}", log.warnings.len());
        }
        print_table(&summary);
        if let Some(months) = months {
            print_monthly(&months);
        }
        if let Some(points) = points {
            print_cumulative(&points);
        }
    }
    Ok(())
}

/// Недостающая граница берётся из журнала.
fn resolve_range(
    log: &TradeLog,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<DateRange>> {
    let range = match (start, end, log.date_span()) {
        (None, None, _) => None,
        (Some(s), Some(e), _) => Some(DateRange::parse(s, e)?),
        (Some(s), None, Some((_, last))) => Some(DateRange::parse(s, &last.to_string())?),
        (None, Some(e), Some((first, _))) => Some(DateRange::parse(&first.to_string(), e)?),
        // Журнал без дат: одна граница ничего не ограничивает.
        (_, _, None) => None,
    };
    Ok(range)
}

fn run_request(path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let response = CalcRequest::from_json(&json)?.compute()?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn percent(rate: Option<Decimal>) -> String {
    rate.map_or_else(
        || "-".to_string(),
        |r| format!("{}%", (r * Decimal::ONE_HUNDRED).round_dp(1)),
    )
}

fn money(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.round_dp(2).to_string())
}

fn print_table(summary: &Summary) {
    if summary.is_empty() {
        println!("Нет сделок для выбранных параметров.");
        return;
    }
    println!(
        "{:<24} {:>7} {:>8} {:>12} {:>14} {:>12} {:>12} {:>14}",
        "Стратегия", "Сделок", "Win", "Avg P/L", "Gross P/L", "Комиссии", "Налог", "Net P/L"
    );
    for row in &summary.strategies {
        println!(
            "{:<24} {:>7} {:>8} {:>12} {:>14} {:>12} {:>12} {:>14}",
            row.strategy,
            row.trades,
            percent(row.win_rate()),
            money(row.average_pl()),
            row.gross_pl.round_dp(2),
            row.commissions.round_dp(2),
            row.tax_paid.round_dp(2),
            row.net_pl.round_dp(2)
        );
    }
    let t = &summary.totals;
    println!(
        "{:<24} {:>7} {:>8} {:>12} {:>14} {:>12} {:>12} {:>14}",
        "Итого",
        t.trades,
        percent(t.win_rate()),
        money(t.average_pl()),
        t.gross_pl.round_dp(2),
        t.commissions.round_dp(2),
        t.tax_paid.round_dp(2),
        t.net_pl.round_dp(2)
    );
}

fn print_monthly(months: &[MonthlyPl]) {
    println!();
    println!("{:<8} {:>7} {:>14}", "Месяц", "Сделок", "P/L");
    for m in months {
        println!(
            "{:<8} {:>7} {:>14}",
            m.month,
            m.trades,
            m.profit_after_commissions.round_dp(2)
        );
    }
}

fn print_cumulative(points: &[CumulativePl]) {
    println!();
    println!("{:<10} {:>14} {:>14}", "Дата", "P/L", "Накоплено");
    for p in points {
        println!(
            "{:<10} {:>14} {:>14}",
            p.date,
            p.daily_pl.round_dp(2),
            p.cumulative_pl.round_dp(2)
        );
    }
}
