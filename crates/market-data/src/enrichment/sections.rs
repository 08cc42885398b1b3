use super::Backfill;
use crate::models::{
    AnalystData, BasicInfo, Dividends, Financials, Ownership, PerShare, PriceHistory, PriceInfo,
    ScreenerData, Shareholding, StockRecord, TradingInfo, Valuation,
};

/// Field-by-field merge for a struct whose fields all implement [`Backfill`].
macro_rules! impl_backfill {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl Backfill for $ty {
            fn is_blank(&self) -> bool {
                true $(&& self.$field.is_blank())+
            }

            fn backfill_from(&mut self, source: &Self) {
                $(self.$field.backfill_from(&source.$field);)+
            }
        }
    };
}

/// Whole-value merge: the destination is replaced only when entirely blank.
macro_rules! impl_wholesale_backfill {
    ($ty:ty => |$value:ident| $blank:expr) => {
        impl Backfill for $ty {
            fn is_blank(&self) -> bool {
                let $value = self;
                $blank
            }

            fn backfill_from(&mut self, source: &Self) {
                if self.is_blank() && !source.is_blank() {
                    self.clone_from(source);
                }
            }
        }
    };
}

impl_backfill!(BasicInfo {
    company_name,
    ticker,
    exchange,
    sector,
    industry,
    description,
    website,
    country,
    isin,
    employees,
    metadata,
});

impl_backfill!(PriceInfo {
    current_price,
    previous_close,
    open,
    day_high,
    day_low,
    fifty_two_week_high,
    fifty_two_week_low,
    change,
    change_percent,
    vwap,
    volume,
    avg_volume,
});

impl_backfill!(Valuation {
    market_cap,
    enterprise_value,
    pe_ratio,
    forward_pe,
    sector_pe,
    peg_ratio,
    pb_ratio,
    ps_ratio,
    ev_to_ebitda,
    ev_to_revenue,
    dividend_yield,
    face_value,
    issued_size,
});

impl_backfill!(Financials {
    revenue,
    revenue_growth,
    gross_profit,
    ebitda,
    net_income,
    gross_margin,
    operating_margin,
    profit_margin,
    ebitda_margin,
    roe,
    roce,
    roa,
    debt_to_equity,
    current_ratio,
    quick_ratio,
    total_cash,
    total_debt,
});

impl_backfill!(PerShare {
    eps,
    forward_eps,
    book_value,
    revenue_per_share,
});

impl_backfill!(Dividends {
    dividend_rate,
    dividend_yield,
    payout_ratio,
    ex_dividend_date,
});

impl_backfill!(AnalystData {
    target_mean_price,
    target_high_price,
    target_low_price,
    recommendation,
    num_analysts,
});

impl_backfill!(Ownership {
    insider_holding,
    institution_holding,
});

impl_backfill!(TradingInfo {
    upper_circuit,
    lower_circuit,
    listing_date,
    is_fno,
});

impl_backfill!(ScreenerData {
    quarterly_results,
    profit_loss,
    balance_sheet,
    cash_flow,
    shareholding,
    ratios,
    pros,
    cons,
    high_low,
    source_url,
    last_updated,
});

// A quarter's breakdown and a price series are only meaningful as a unit.
impl_wholesale_backfill!(Shareholding => |s| s.breakdown.is_empty());
impl_wholesale_backfill!(PriceHistory => |h| h.dates.is_empty() || h.prices.is_empty());

// `provider` and `enriched_by` are attribution, not data.
impl_backfill!(StockRecord {
    basic_info,
    price_info,
    valuation,
    financials,
    per_share,
    dividends,
    analyst_data,
    ownership,
    trading_info,
    screener_data,
    quarterly_results,
    shareholding,
    corporate_actions,
    announcements,
    news,
    price_history,
});

impl StockRecord {
    /// Fill blank fields of this record from `source`.
    ///
    /// Populated fields are never touched. When at least one field was filled,
    /// `source_name` is appended to [`enriched_by`](StockRecord::enriched_by)
    /// (once). Returns whether anything changed.
    pub fn merge_from(&mut self, source_name: &str, source: &StockRecord) -> bool {
        let before = self.clone();
        self.backfill_from(source);

        let provider = std::mem::take(&mut self.provider);
        let enriched_by = std::mem::take(&mut self.enriched_by);
        let changed = *self
            != StockRecord {
                provider: String::new(),
                enriched_by: Vec::new(),
                ..before
            };
        self.provider = provider;
        self.enriched_by = enriched_by;

        if changed
            && !source_name.is_empty()
            && !self.enriched_by.iter().any(|name| name == source_name)
        {
            self.enriched_by.push(source_name.to_string());
        }
        changed
    }
}
