// Property-based tests for the matching stages.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use vouch_recon::config::{CollisionPolicy, FallbackTier, ReconConfig};
use vouch_recon::model::MatchStatus;
use vouch_recon::{load_orders, load_statements, run, Table};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

// Small pools so keys, amounts and dates collide often.
const CODES: [&str; 3] = ["123456", "234567", "345678"];
const AMOUNTS: [&str; 4] = ["100000", "250.000", "1.500.000,00", "n/a"];
const DATES: [&str; 4] = ["2024-03-01", "02/03/2024", "2024-03-03", "bukan tanggal"];
const AGENCIES: [&str; 3] = ["1.01 Dinas Pendidikan", "Dinas Kesehatan", "Badan Keuangan"];

fn arb_statement_row() -> impl Strategy<Value = Vec<String>> {
    (0..DATES.len(), 0..4usize, 0..AGENCIES.len(), 0..AMOUNTS.len()).prop_map(
        |(date, code, agency, amount)| {
            let description = match CODES.get(code) {
                Some(c) => format!("SP2D {c} {}", AGENCIES[agency]),
                None => format!("BELANJA {}", AGENCIES[agency]),
            };
            vec![DATES[date].to_string(), description, AMOUNTS[amount].to_string()]
        },
    )
}

fn arb_order_row() -> impl Strategy<Value = Vec<String>> {
    (0..AGENCIES.len(), 0..CODES.len(), 0..DATES.len(), 0..AMOUNTS.len()).prop_map(
        |(agency, code, date, amount)| {
            vec![
                AGENCIES[agency].to_string(),
                format!("00{}", CODES[code]),
                DATES[date].to_string(),
                AMOUNTS[amount].to_string(),
            ]
        },
    )
}

fn arb_tables() -> impl Strategy<Value = (Table, Table)> {
    (
        proptest::collection::vec(arb_statement_row(), 0..24),
        proptest::collection::vec(arb_order_row(), 0..24),
    )
        .prop_map(|(rk, sp2d)| {
            let rk_headers = ["tanggal", "keterangan", "jumlah"].map(String::from).to_vec();
            let sp2d_headers = ["skpd", "nosp2d", "tglsp2d", "jumlah"].map(String::from).to_vec();
            (Table::new(rk_headers, rk), Table::new(sp2d_headers, sp2d))
        })
}

fn arb_config() -> impl Strategy<Value = ReconConfig> {
    let tiers = proptest::sample::subsequence(
        vec![
            FallbackTier::AmountDate,
            FallbackTier::AmountDateAgency,
            FallbackTier::AmountDateAgencyWindow,
        ],
        0..=3,
    );
    (prop::bool::ANY, tiers, 0u32..4).prop_map(|(reject, tiers, window)| {
        let mut config = ReconConfig::default();
        config.matching.collision = if reject {
            CollisionPolicy::RejectAmbiguous
        } else {
            CollisionPolicy::FirstWins
        };
        config.matching.tiers = tiers;
        config.matching.date_window_days = window;
        config
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn no_order_consumed_twice((rk, sp2d) in arb_tables(), config in arb_config()) {
        let result = run(&config, &rk, &sp2d).unwrap();

        let mut linked = HashSet::new();
        for s in &result.statements {
            prop_assert_eq!(s.link.is_some(), s.status.is_matched());
            if let Some(link) = &s.link {
                prop_assert!(linked.insert(link.order_row), "order {} linked twice", link.order_row);
            }
        }
        for o in &result.unmatched_orders {
            prop_assert!(!linked.contains(&o.row_index));
        }
    }

    #[test]
    fn every_row_accounted_for((rk, sp2d) in arb_tables(), config in arb_config()) {
        let result = run(&config, &rk, &sp2d).unwrap();
        let s = &result.summary;

        prop_assert_eq!(result.statements.len(), rk.len());
        prop_assert_eq!(s.matched_primary + s.matched_fallback + s.unmatched, rk.len());
        prop_assert_eq!(s.matched_primary + s.matched_fallback + result.unmatched_orders.len(), sp2d.len());
        prop_assert_eq!(s.status_counts.values().sum::<usize>(), rk.len());
        prop_assert_eq!(s.matched_amount_minor + s.unmatched_amount_minor, s.total_amount_minor);

        let rows: Vec<usize> = result.statements.iter().map(|c| c.record.row_index).collect();
        prop_assert_eq!(rows, (0..rk.len()).collect::<Vec<_>>());
    }

    #[test]
    fn matches_agree_on_amount((rk, sp2d) in arb_tables(), config in arb_config()) {
        let result = run(&config, &rk, &sp2d).unwrap();
        let orders = load_orders(&sp2d, &config).unwrap();

        for s in &result.statements {
            let Some(link) = &s.link else { continue };
            let order = &orders[link.order_row];
            prop_assert!(s.record.amount_minor.is_some());
            prop_assert_eq!(s.record.amount_minor, order.amount_minor);
            match s.status {
                MatchStatus::Matched => {
                    prop_assert_eq!(&s.record.reference_code, &order.reference_code);
                }
                MatchStatus::MatchedSecondary | MatchStatus::MatchedAgency => {
                    prop_assert!(s.record.date.is_some());
                    prop_assert_eq!(s.record.date, order.issue_date);
                }
                MatchStatus::MatchedWindow => {
                    let (Some(a), Some(b)) = (s.record.date, order.issue_date) else {
                        return Err(TestCaseError::fail("window match without dates"));
                    };
                    let days = (a - b).num_days().unsigned_abs();
                    prop_assert!(days <= u64::from(config.matching.date_window_days));
                }
                MatchStatus::Unmatched => unreachable!(),
            }
        }
    }

    #[test]
    fn unparseable_amounts_stay_unmatched((rk, sp2d) in arb_tables(), config in arb_config()) {
        let result = run(&config, &rk, &sp2d).unwrap();
        for s in &result.statements {
            if s.record.amount_minor.is_none() {
                prop_assert_eq!(s.status, MatchStatus::Unmatched);
            }
        }
        let statements = load_statements(&rk, &config).unwrap();
        let unparseable = statements.iter().filter(|r| r.amount_minor.is_none()).count();
        prop_assert_eq!(result.summary.unparseable_amounts, unparseable);
    }

    #[test]
    fn runs_are_deterministic((rk, sp2d) in arb_tables(), config in arb_config()) {
        let first = run(&config, &rk, &sp2d).unwrap();
        let second = run(&config, &rk, &sp2d).unwrap();
        prop_assert_eq!(first, second);
    }
}
