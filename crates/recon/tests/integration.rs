use std::path::PathBuf;

use vouch_recon::config::{CollisionPolicy, FallbackTier, ReconConfig, ReferenceRule};
use vouch_recon::model::{MatchStatus, ReconResult};
use vouch_recon::output::{statement_table, unmatched_order_table};
use vouch_recon::{run, ReconError, Table, TableKind};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture_table(name: &str) -> Table {
    let path = fixtures_dir().join(name);
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    Table::from_csv(&data).unwrap()
}

fn load_and_run(config: &ReconConfig) -> ReconResult {
    run(config, &fixture_table("rk.csv"), &fixture_table("sp2d.csv")).unwrap()
}

fn fixture_config() -> ReconConfig {
    let toml = std::fs::read_to_string(fixtures_dir().join("vouch.toml")).unwrap();
    ReconConfig::from_toml(&toml).unwrap()
}

fn statuses(result: &ReconResult) -> Vec<MatchStatus> {
    result.statements.iter().map(|s| s.status).collect()
}

// -------------------------------------------------------------------------
// Fixture scenario
// -------------------------------------------------------------------------

#[test]
fn fixture_all_tiers() {
    let result = load_and_run(&fixture_config());

    assert_eq!(
        statuses(&result),
        vec![
            MatchStatus::Matched,
            MatchStatus::Matched,
            MatchStatus::MatchedSecondary,
            MatchStatus::MatchedWindow,
            MatchStatus::Unmatched,
            MatchStatus::Unmatched,
        ]
    );

    // duplicate primary key: the first RK line takes the SP2D sharing its code,
    // the second is recovered by amount + date against another SP2D
    assert_eq!(result.statements[1].link.as_ref().unwrap().reference_number, "00234567");
    assert_eq!(result.statements[2].link.as_ref().unwrap().reference_number, "00345678");

    let window = result.statements[3].link.as_ref().unwrap();
    assert_eq!(window.reference_number, "00777777");
    assert_eq!(window.agency, "1.02 Dinas Kesehatan");
    assert_eq!(window.issue_date.unwrap().to_string(), "2024-03-03");

    assert_eq!(result.unmatched_orders.len(), 1);
    assert_eq!(result.unmatched_orders[0].reference_number, "00456789");

    let s = &result.summary;
    assert_eq!(s.statements_total, 6);
    assert_eq!(s.orders_total, 5);
    assert_eq!(s.matched_primary, 2);
    assert_eq!(s.matched_fallback, 2);
    assert_eq!(s.unmatched, 2);
    assert_eq!(s.orders_unmatched, 1);
    assert_eq!(s.ambiguous, 2);
    assert_eq!(s.unparseable_amounts, 1);
    assert_eq!(s.missing_reference_codes, 2);
    assert_eq!(s.matched_amount_minor, 3_075_000_000);
    assert_eq!(s.unmatched_amount_minor, 1_500_000);
    assert_eq!(s.total_amount_minor, 3_076_500_000);
    assert_eq!(s.status_counts["Matched (Date Window)"], 1);
}

#[test]
fn fixture_default_config_stops_at_secondary() {
    let result = load_and_run(&ReconConfig::default());

    assert_eq!(result.statements[3].status, MatchStatus::Unmatched);
    assert_eq!(result.unmatched_orders.len(), 2);
    assert_eq!(result.meta.tiers, vec![FallbackTier::AmountDate]);
}

#[test]
fn fixture_reject_ambiguous() {
    let mut config = fixture_config();
    config.matching.collision = CollisionPolicy::RejectAmbiguous;
    let result = load_and_run(&config);

    // both colliding lines skip the primary stage; amount + date then pairs
    // each with the SP2D issued on its own date
    assert_eq!(result.statements[1].status, MatchStatus::MatchedSecondary);
    assert_eq!(result.statements[2].status, MatchStatus::MatchedSecondary);
    assert_eq!(result.statements[1].link.as_ref().unwrap().reference_number, "00234567");
    assert_eq!(result.statements[2].link.as_ref().unwrap().reference_number, "00345678");
    assert_eq!(result.summary.matched_primary, 1);
}

#[test]
fn fixture_output_tables() {
    let rk = fixture_table("rk.csv");
    let sp2d = fixture_table("sp2d.csv");
    let result = run(&fixture_config(), &rk, &sp2d).unwrap();

    let out = statement_table(&rk, &result);
    assert_eq!(out.rows.len(), 6);
    assert_eq!(out.headers[..3], ["Tanggal", "Keterangan", "Jumlah"]);
    assert_eq!(out.rows[3][4], "Matched (Date Window)");
    assert_eq!(out.rows[3][6], "2024-03-03");
    assert_eq!(out.rows[4][3], "456789");

    let left = unmatched_order_table(&sp2d, &result);
    assert_eq!(left.rows.len(), 1);
    assert_eq!(left.rows[0][4], "456789");
}

// -------------------------------------------------------------------------
// Documented behaviors
// -------------------------------------------------------------------------

#[test]
fn leftmost_six_against_last_six() {
    let rk = Table::from_csv(
        "tanggal,keterangan,jumlah\n2024-03-01,Payment 123456 for services,5000000\n",
    )
    .unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,987123456,2024-03-01,5000000\n").unwrap();

    let result = run(&ReconConfig::default(), &rk, &sp2d).unwrap();
    let s = &result.statements[0];
    assert_eq!(s.record.reference_code.as_deref(), Some("123456"));
    assert_eq!(s.status, MatchStatus::Matched);
    assert_eq!(s.link.as_ref().unwrap().agency, "X");
    assert!(result.unmatched_orders.is_empty());
}

#[test]
fn primary_match_regardless_of_date() {
    let rk = Table::from_csv("tanggal,keterangan,jumlah\n2024-06-30,SP2D 123456,5000000\n").unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,123456,2024-01-02,5000000\n").unwrap();
    let result = run(&ReconConfig::default(), &rk, &sp2d).unwrap();
    assert_eq!(result.statements[0].status, MatchStatus::Matched);
}

#[test]
fn unparseable_amounts_never_match() {
    let rk = Table::from_csv("tanggal,keterangan,jumlah\n2024-03-01,SP2D 123456,n/a\n").unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,123456,2024-03-01,n/a\n").unwrap();
    let result = run(&ReconConfig::default(), &rk, &sp2d).unwrap();
    assert_eq!(result.statements[0].status, MatchStatus::Unmatched);
    assert_eq!(result.unmatched_orders.len(), 1);
}

#[test]
fn blank_references_do_not_join() {
    let rk = Table::from_csv("tanggal,keterangan,jumlah\n2024-03-01,tanpa nomor,5000000\n").unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,,2024-03-02,5000000\n").unwrap();
    let mut config = ReconConfig::default();
    config.matching.tiers.clear();
    let result = run(&config, &rk, &sp2d).unwrap();
    assert_eq!(result.statements[0].status, MatchStatus::Unmatched);
}

#[test]
fn last_token_rule() {
    let rk = Table::from_csv(
        "tanggal,keterangan,jumlah\n2024-03-01,SP2D 2024 NO 00987654,250000\n",
    )
    .unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,11987654,2024-03-09,250000\n").unwrap();

    let default = run(&ReconConfig::default(), &rk, &sp2d).unwrap();
    assert_eq!(default.statements[0].status, MatchStatus::Unmatched);

    let mut config = ReconConfig::default();
    config.reference.statement_rule = ReferenceRule::LastToken;
    let result = run(&config, &rk, &sp2d).unwrap();
    assert_eq!(result.statements[0].record.reference_code.as_deref(), Some("987654"));
    assert_eq!(result.statements[0].status, MatchStatus::Matched);
}

#[test]
fn custom_column_names() {
    let config = ReconConfig::from_toml(
        r#"
[columns.statement]
date = "Tgl"
description = "Uraian"
amount = "Kredit"
"#,
    )
    .unwrap();
    let rk = Table::from_csv("TGL,URAIAN,KREDIT\n2024-03-01,SP2D 123456,5000000\n").unwrap();
    let sp2d = Table::from_csv("skpd,nosp2d,tglsp2d,jumlah\nX,123456,2024-03-01,5000000\n").unwrap();
    let result = run(&config, &rk, &sp2d).unwrap();
    assert_eq!(result.statements[0].status, MatchStatus::Matched);
}

#[test]
fn missing_order_columns_rejected() {
    let rk = fixture_table("rk.csv");
    let sp2d = Table::from_csv("SKPD,Nilai\nX,5000000\n").unwrap();
    let err = run(&ReconConfig::default(), &rk, &sp2d).unwrap_err();
    match err {
        ReconError::MissingColumns { table, columns } => {
            assert_eq!(table, TableKind::Orders);
            assert_eq!(columns, vec!["nosp2d", "tglsp2d", "jumlah"]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn repeated_runs_identical() {
    let config = fixture_config();
    let first = load_and_run(&config);
    let second = load_and_run(&config);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn result_json_shape() {
    let result = load_and_run(&fixture_config());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["meta"]["statement_rule"], "leftmost_six");
    assert_eq!(json["meta"]["tiers"][1], "amount_date_agency_window");
    assert_eq!(json["statements"][3]["status"], "matched_window");
    assert_eq!(json["statements"][3]["link"]["issue_date"], "2024-03-03");
    assert!(json["statements"][5].get("link").is_none());
    assert_eq!(json["unmatched_orders"][0]["reference_code"], "456789");
}
