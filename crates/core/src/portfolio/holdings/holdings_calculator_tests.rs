#[cfg(test)]
mod tests {
    use crate::errors::{CalculatorError, Error};
    use crate::fx::FxService;
    use crate::portfolio::holdings::{HoldingsCalculator, ReconstructedHoldings};
    use crate::portfolios::Portfolio;
    use crate::securities::Security;
    use crate::settings::FeePolicy;
    use crate::test_support::{cash, date, portfolio, security, trade, transaction, InMemoryFxRates};
    use crate::transactions::{Transaction, TransactionType};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn calculator_with_rates(
        fee_policy: FeePolicy,
        rates: &[(&str, &str, chrono::NaiveDate, Decimal)],
    ) -> HoldingsCalculator {
        let repo = Arc::new(InMemoryFxRates::default());
        for (from, to, on, rate) in rates {
            repo.add(from, to, *on, *rate);
        }
        HoldingsCalculator::new(Arc::new(FxService::new(repo)), fee_policy)
    }

    fn securities(list: &[Security]) -> HashMap<String, Security> {
        list.iter().map(|s| (s.id.clone(), s.clone())).collect()
    }

    fn run(
        calculator: &HoldingsCalculator,
        portfolio: &Portfolio,
        known: &[Security],
        transactions: &[Transaction],
    ) -> ReconstructedHoldings {
        calculator
            .calculate(portfolio, &securities(known), transactions, date(2030, 1, 1))
            .unwrap()
    }

    #[test]
    fn test_buy_with_capitalized_fee() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![trade(
            1,
            TransactionType::Buy,
            "AAPL",
            date(2024, 1, 2),
            dec!(10),
            dec!(100),
            dec!(10),
        )];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.quantity, dec!(10));
        assert_eq!(holding.total_cost, dec!(1010));
        assert_eq!(holding.total_cost_base, dec!(1010));
        assert_eq!(holding.lots.len(), 1);
        assert_eq!(holding.fees_paid_base, dec!(10));
        assert_eq!(holding.net_cash_invested_base, dec!(1010));
        assert_eq!(result.cash.purchases, dec!(1010));
    }

    #[test]
    fn test_buy_with_expensed_fee() {
        let calc = calculator_with_rates(FeePolicy::Expense, &[]);
        let txs = vec![trade(
            1,
            TransactionType::Buy,
            "AAPL",
            date(2024, 1, 2),
            dec!(10),
            dec!(100),
            dec!(10),
        )];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.total_cost_base, dec!(1000));
        assert_eq!(holding.fees_paid_base, dec!(10));
        assert_eq!(result.cash.purchases, dec!(1010));
    }

    #[test]
    fn test_sell_realizes_fifo_gain() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(5),
                dec!(150),
                Decimal::ZERO,
            ),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.realized_gain, dec!(250));
        assert_eq!(holding.realized_gain_base, dec!(250));
        assert_eq!(holding.quantity, dec!(5));
        assert_eq!(holding.total_cost, dec!(500));
        assert_eq!(result.realized_gain_base, dec!(250));
        assert_eq!(holding.net_cash_invested_base, dec!(250));
    }

    #[test]
    fn test_sell_consumes_oldest_lots_first() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 3),
                dec!(10),
                dec!(200),
                Decimal::ZERO,
            ),
            trade(
                3,
                TransactionType::Sell,
                "AAPL",
                date(2024, 2, 1),
                dec!(15),
                dec!(250),
                Decimal::ZERO,
            ),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        // relief: 10 @ 100 + 5 @ 200 = 2000; proceeds 3750
        assert_eq!(holding.realized_gain, dec!(1750));
        assert_eq!(holding.lots.len(), 1);
        assert_eq!(holding.lots[0].transaction_id, 2);
        assert_eq!(holding.lots[0].remaining_quantity, dec!(5));
        assert_eq!(holding.total_cost, dec!(1000));
    }

    #[test]
    fn test_same_day_transactions_replay_in_id_order() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let day = date(2024, 1, 2);
        // Supplied out of order: the sell has the higher id and must run second.
        let txs = vec![
            trade(2, TransactionType::Sell, "AAPL", day, dec!(4), dec!(120), Decimal::ZERO),
            trade(1, TransactionType::Buy, "AAPL", day, dec!(10), dec!(100), Decimal::ZERO),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);
        assert_eq!(result.holdings["AAPL"].quantity, dec!(6));
        assert!(result.warnings.is_empty());
        assert_eq!(result.last_transaction_id, Some(2));
    }

    #[test]
    fn test_oversell_consumes_what_exists_and_warns() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(5),
                dec!(100),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::Sell,
                "AAPL",
                date(2024, 1, 3),
                dec!(8),
                dec!(110),
                Decimal::ZERO,
            ),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        assert!(result.holdings.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].transaction_id, Some(2));
        // only the 5 units held were sold
        assert_eq!(result.realized_gain_base, dec!(50));
    }

    #[test]
    fn test_dividend_reduces_cost_basis() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut dividend = transaction(
            2,
            TransactionType::Dividend,
            Some("AAPL"),
            date(2024, 3, 1),
        );
        dividend.quantity = dec!(10);
        dividend.unit_price = dec!(2);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            dividend,
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.total_cost, dec!(980));
        assert_eq!(holding.total_cost_base, dec!(980));
        assert_eq!(holding.dividends_received, dec!(20));
        assert_eq!(holding.dividends_received_base, dec!(20));
        assert_eq!(holding.realized_gain, Decimal::ZERO);
        assert_eq!(holding.net_cash_invested_base, dec!(1000));
        assert_eq!(result.cash.income, dec!(20));
    }

    #[test]
    fn test_dividend_cost_reduction_floors_at_zero() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut dividend = transaction(
            2,
            TransactionType::Dividend,
            Some("AAPL"),
            date(2024, 3, 1),
        );
        dividend.amount = Some(dec!(150));
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(1),
                dec!(100),
                Decimal::ZERO,
            ),
            dividend,
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.total_cost, Decimal::ZERO);
        assert_eq!(holding.dividends_received, dec!(150));
    }

    #[test]
    fn test_split_scales_quantity_and_keeps_cost() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut split = transaction(3, TransactionType::Split, Some("AAPL"), date(2024, 6, 1));
        split.split_ratio = Some("3:1".to_string());
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(90),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::Buy,
                "AAPL",
                date(2024, 2, 2),
                dec!(5),
                dec!(120),
                Decimal::ZERO,
            ),
            split,
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.quantity, dec!(45));
        assert_eq!(holding.total_cost, dec!(1500));
        assert_eq!(holding.lots[0].remaining_quantity, dec!(30));
        assert_eq!(holding.lots[0].unit_price, dec!(30));
        assert_eq!(holding.lots[1].unit_price, dec!(40));
    }

    #[test]
    fn test_reverse_split_then_sell() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut split = transaction(2, TransactionType::Split, Some("AAPL"), date(2024, 6, 1));
        split.split_ratio = Some("1:4".to_string());
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(100),
                dec!(5),
                Decimal::ZERO,
            ),
            split,
            trade(
                3,
                TransactionType::Sell,
                "AAPL",
                date(2024, 7, 1),
                dec!(5),
                dec!(30),
                Decimal::ZERO,
            ),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.quantity, dec!(20));
        assert_eq!(holding.total_cost, dec!(400));
        assert_eq!(holding.realized_gain, dec!(50));
    }

    #[test]
    fn test_malformed_split_adds_quantity_with_warning() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut split = transaction(2, TransactionType::Split, Some("AAPL"), date(2024, 6, 1));
        split.split_ratio = Some("two-for-one".to_string());
        split.quantity = dec!(10);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            split,
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.quantity, dec!(20));
        assert_eq!(holding.total_cost, dec!(1000));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("two-for-one"));
    }

    #[test]
    fn test_transfers_move_lots_without_gain() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            trade(
                1,
                TransactionType::TransferIn,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(50),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::TransferOut,
                "AAPL",
                date(2024, 3, 1),
                dec!(4),
                dec!(80),
                dec!(1),
            ),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.quantity, dec!(6));
        assert_eq!(holding.total_cost, dec!(300));
        assert_eq!(holding.realized_gain, Decimal::ZERO);
        assert_eq!(result.cash.purchases, Decimal::ZERO);
        assert_eq!(result.cash.fees, dec!(1));
    }

    #[test]
    fn test_fee_and_interest() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let mut fee = transaction(2, TransactionType::Fee, Some("AAPL"), date(2024, 2, 1));
        fee.amount = Some(dec!(5));
        let interest = cash(3, TransactionType::Interest, date(2024, 2, 2), dec!(7));
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            fee,
            interest,
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        let holding = &result.holdings["AAPL"];
        assert_eq!(holding.total_cost, dec!(1005));
        assert_eq!(holding.fees_paid_base, dec!(5));
        assert_eq!(holding.net_cash_invested_base, dec!(1005));
        assert_eq!(result.cash.fees, dec!(5));
        assert_eq!(result.cash.income, dec!(7));
    }

    #[test]
    fn test_cash_summary_balance() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            cash(1, TransactionType::Deposit, date(2024, 1, 1), dec!(2000)),
            trade(2, TransactionType::Buy, "AAPL", date(2024, 1, 2), dec!(10), dec!(100), dec!(10)),
            trade(3, TransactionType::Sell, "AAPL", date(2024, 2, 1), dec!(5), dec!(150), dec!(5)),
            cash(4, TransactionType::Withdrawal, date(2024, 3, 1), dec!(300)),
        ];
        let result = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);

        assert!(result.has_external_flows);
        // 2000 - 1010 + 745 - 300
        assert_eq!(result.cash.balance(), dec!(1435));
    }

    #[test]
    fn test_foreign_buy_converts_at_transaction_date() {
        let calc = calculator_with_rates(
            FeePolicy::Capitalize,
            &[
                ("EUR", "USD", date(2024, 1, 1), dec!(1.10)),
                ("EUR", "USD", date(2024, 6, 1), dec!(1.20)),
            ],
        );
        let mut buy = trade(
            1,
            TransactionType::Buy,
            "SAP",
            date(2024, 1, 5),
            dec!(10),
            dec!(100),
            Decimal::ZERO,
        );
        buy.currency = "EUR".to_string();
        let result = run(&calc, &portfolio("p1", "USD"), &[security("SAP", "EUR")], &[buy]);

        let holding = &result.holdings["SAP"];
        assert_eq!(holding.total_cost, dec!(1000));
        assert_eq!(holding.total_cost_base, dec!(1100.00));
    }

    #[test]
    fn test_pre_resolved_base_amount_wins() {
        let calc = calculator_with_rates(
            FeePolicy::Capitalize,
            &[("EUR", "USD", date(2024, 1, 1), dec!(1.10))],
        );
        let mut buy = trade(
            1,
            TransactionType::Buy,
            "SAP",
            date(2024, 1, 5),
            dec!(10),
            dec!(100),
            Decimal::ZERO,
        );
        buy.currency = "EUR".to_string();
        buy.base_amount = Some(dec!(1150));
        let result = run(&calc, &portfolio("p1", "USD"), &[security("SAP", "EUR")], &[buy]);
        assert_eq!(result.holdings["SAP"].total_cost_base, dec!(1150));
    }

    #[test]
    fn test_minor_unit_security_currency() {
        let calc = calculator_with_rates(
            FeePolicy::Capitalize,
            &[("GBP", "USD", date(2024, 1, 1), dec!(1.25))],
        );
        let mut buy = trade(
            1,
            TransactionType::Buy,
            "VOD",
            date(2024, 1, 5),
            dec!(100),
            dec!(2),
            Decimal::ZERO,
        );
        buy.currency = "GBP".to_string();
        let result = run(&calc, &portfolio("p1", "USD"), &[security("VOD", "GBp")], &[buy]);

        let holding = &result.holdings["VOD"];
        // 200 GBP is 20000 pence and 250 USD
        assert_eq!(holding.total_cost, dec!(20000));
        assert_eq!(holding.lots[0].unit_price, dec!(200));
        assert_eq!(holding.total_cost_base, dec!(250));
    }

    #[test]
    fn test_missing_rate_degrades_to_latest_then_unconverted() {
        let calc = calculator_with_rates(
            FeePolicy::Capitalize,
            &[("EUR", "USD", date(2024, 6, 1), dec!(1.20))],
        );
        let mut early = trade(
            1,
            TransactionType::Buy,
            "SAP",
            date(2024, 1, 5),
            dec!(1),
            dec!(100),
            Decimal::ZERO,
        );
        early.currency = "EUR".to_string();
        let mut unknown = trade(
            2,
            TransactionType::Buy,
            "SONY",
            date(2024, 1, 5),
            dec!(1),
            dec!(1000),
            Decimal::ZERO,
        );
        unknown.currency = "JPY".to_string();
        let result = run(
            &calc,
            &portfolio("p1", "USD"),
            &[security("SAP", "EUR"), security("SONY", "JPY")],
            &[early, unknown],
        );

        assert_eq!(result.holdings["SAP"].total_cost_base, dec!(120));
        assert_eq!(result.holdings["SONY"].total_cost_base, dec!(1000));
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_unknown_security_is_fatal() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![trade(
            1,
            TransactionType::Buy,
            "GHOST",
            date(2024, 1, 2),
            dec!(1),
            dec!(1),
            Decimal::ZERO,
        )];
        let err = calc
            .calculate(&portfolio("p1", "USD"), &HashMap::new(), &txs, date(2030, 1, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Calculation(CalculatorError::UnknownSecurity { transaction_id: 1, .. })
        ));
    }

    #[test]
    fn test_as_of_excludes_later_transactions() {
        let calc = calculator_with_rates(FeePolicy::Capitalize, &[]);
        let txs = vec![
            trade(
                1,
                TransactionType::Buy,
                "AAPL",
                date(2024, 1, 2),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
            trade(
                2,
                TransactionType::Sell,
                "AAPL",
                date(2024, 3, 1),
                dec!(10),
                dec!(100),
                Decimal::ZERO,
            ),
        ];
        let result = calc
            .calculate(
                &portfolio("p1", "USD"),
                &securities(&[security("AAPL", "USD")]),
                &txs,
                date(2024, 2, 1),
            )
            .unwrap();
        assert_eq!(result.holdings["AAPL"].quantity, dec!(10));
        assert_eq!(result.last_transaction_id, Some(1));

        let closed = run(&calc, &portfolio("p1", "USD"), &[security("AAPL", "USD")], &txs);
        assert!(closed.holdings.is_empty());
    }
}
