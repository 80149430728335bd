//! Stable trade ordering and per-date grouping for deterministic replay.

use crate::domain::TradeRecord;
use chrono::NaiveDate;

/// Sort trades by date, keeping input order within a date.
///
/// `sort_by_key` is stable, so two trades on the same day are replayed (and
/// logged) in the order the ledger supplied them.
pub fn sort_trades_by_date(trades: &mut [TradeRecord]) {
    trades.sort_by_key(|t| t.trade_date);
}

/// Split date-sorted trades into consecutive same-date groups.
///
/// Callers must sort first; an unsorted slice yields one group per run of
/// equal dates.
pub fn group_by_date(trades: &[TradeRecord]) -> Vec<(NaiveDate, &[TradeRecord])> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < trades.len() {
        let date = trades[start].trade_date;
        let len = trades[start..]
            .iter()
            .take_while(|t| t.trade_date == date)
            .count();
        groups.push((date, &trades[start..start + len]));
        start += len;
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Symbol, TradeType};

    fn trade(symbol: &str, day: u32, qty: i64) -> TradeRecord {
        TradeRecord::new(
            Symbol::new(symbol),
            NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            TradeType::Buy,
            Decimal::from(qty),
            Decimal::from(1),
        )
        .unwrap()
    }

    #[test]
    fn test_sort_is_stable_within_date() {
        let mut trades = vec![trade("B", 2, 1), trade("A", 1, 1), trade("C", 2, 2)];
        sort_trades_by_date(&mut trades);
        let symbols: Vec<_> = trades.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_group_by_date() {
        let trades = vec![trade("A", 1, 1), trade("B", 1, 2), trade("A", 3, 3)];
        let groups = group_by_date(&trades);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, NaiveDate::from_ymd_opt(2020, 1, 3).unwrap());
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn test_group_by_date_empty() {
        assert!(group_by_date(&[]).is_empty());
    }
}
