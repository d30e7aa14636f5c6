use std::fs;

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use secagg::config::EnrichArgs;
use secagg::dataset::{Columns, INTERACTION_COUNT_COLUMN, TOTAL_AMOUNT_COLUMN};
use secagg::errors::{DatasetError, MpcError, PipelineError};
use secagg::pipeline::{enrich_file, enrich_table, EnrichSummary};
use secagg::private_test_utils::{init_tracing, plain_count_and_sum, transactions_csv};
use secagg::{PairKey, SessionConfig, Table};

fn args(dir: &TempDir, csv: &str) -> Result<EnrichArgs> {
    let input = dir.path().join("processed_dataset.csv");
    fs::write(&input, csv)?;
    Ok(EnrichArgs {
        input,
        output: dir.path().join("enriched_dataset1.csv"),
        sender_column: "Sender_account".into(),
        receiver_column: "Receiver_account".into(),
        amount_column: "Amount".into(),
        parties: 3,
        frac_bits: 16,
        seed: None,
    })
}

#[tokio::test]
async fn enriches_example_file() -> Result<()> {
    let _guard = init_tracing();
    let dir = tempfile::tempdir()?;
    let args = args(
        &dir,
        &transactions_csv(&[("A", "B", 10.0), ("A", "B", 20.0), ("C", "D", 5.0)]),
    )?;

    let summary = enrich_file(&args).await?;
    assert_eq!(EnrichSummary { rows: 3, pairs: 2 }, summary);

    let expected = "\
Id,Sender_account,Receiver_account,Amount,interaction_count,total_transaction_amount
0,A,B,10,2,30.0
1,A,B,20,2,30.0
2,C,D,5,1,5.0
";
    assert_eq!(expected, fs::read_to_string(&args.output)?);
    Ok(())
}

#[tokio::test]
async fn single_row() -> Result<()> {
    let table = Table::from_reader(
        transactions_csv(&[("1001", "2002", 1459.5)]).as_bytes(),
        &Columns::default(),
    )?;
    let (enriched, _) = enrich_table(&table, SessionConfig::default()).await?;
    assert_eq!(Some(vec!["1"]), enriched.column(INTERACTION_COUNT_COLUMN));
    assert_eq!(Some(vec!["1459.5"]), enriched.column(TOTAL_AMOUNT_COLUMN));
    Ok(())
}

#[tokio::test]
async fn empty_input_keeps_header() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let args = args(&dir, &transactions_csv(&[]))?;

    let summary = enrich_file(&args).await?;
    assert_eq!(EnrichSummary { rows: 0, pairs: 0 }, summary);
    assert_eq!(
        "Id,Sender_account,Receiver_account,Amount,interaction_count,total_transaction_amount\n",
        fs::read_to_string(&args.output)?
    );
    Ok(())
}

#[tokio::test]
async fn output_is_deterministic() -> Result<()> {
    let rows = [
        ("A", "B", 0.1),
        ("B", "A", 1234.56),
        ("A", "B", 0.2),
        ("C", "A", -3.75),
    ];
    let dir = tempfile::tempdir()?;
    let mut args = args(&dir, &transactions_csv(&rows))?;

    enrich_file(&args).await?;
    let first = fs::read_to_string(&args.output)?;
    // different share randomness and party count must not change the result
    args.parties = 5;
    args.seed = Some(17);
    enrich_file(&args).await?;
    let second = fs::read_to_string(&args.output)?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn matches_plaintext_aggregation() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(4242);
    let accounts: Vec<String> = (0..6).map(|id| format!("{}", 1000 + id)).collect();
    let rows: Vec<(String, String, f64)> = (0..200)
        .map(|_| {
            let sender = accounts[rng.gen_range(0..accounts.len())].clone();
            let receiver = accounts[rng.gen_range(0..accounts.len())].clone();
            let cents: i64 = rng.gen_range(1..1_000_000);
            (sender, receiver, cents as f64 / 100.0)
        })
        .collect();
    let rows: Vec<(&str, &str, f64)> = rows
        .iter()
        .map(|(sender, receiver, amount)| (sender.as_str(), receiver.as_str(), *amount))
        .collect();
    let expected = plain_count_and_sum(&rows);

    let table = Table::from_reader(transactions_csv(&rows).as_bytes(), &Columns::default())?;
    let (enriched, summary) = enrich_table(&table, SessionConfig::default().with_seed(1)).await?;
    assert_eq!(expected.len(), summary.pairs);

    let counts = enriched.column(INTERACTION_COUNT_COLUMN).unwrap();
    let totals = enriched.column(TOTAL_AMOUNT_COLUMN).unwrap();
    for (idx, (sender, receiver, _)) in rows.iter().enumerate() {
        let (count, total) = expected[&PairKey::new(sender, receiver)];
        assert_eq!(count.to_string(), counts[idx]);
        let revealed: f64 = totals[idx].parse()?;
        // each row contributes at most half a unit in the last place of the encoding
        let tolerance = count as f64 * 0.5 / 65536.0 + 1e-9;
        assert!(
            (revealed - total).abs() <= tolerance,
            "row {idx}: {revealed} != {total}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn missing_input_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut args = args(&dir, "")?;
    args.input = dir.path().join("does-not-exist.csv");
    let err = enrich_file(&args).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Dataset(DatasetError::Read { .. })
    ));
    assert!(!args.output.exists());
    Ok(())
}

#[tokio::test]
async fn missing_column() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let args = args(&dir, "Sender_account,Amount\nA,1\n")?;
    let err = enrich_file(&args).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Dataset(DatasetError::MissingColumn(_))
    ));
    Ok(())
}

#[tokio::test]
async fn non_finite_amount_aborts_session() -> Result<()> {
    let table = Table::from_reader(
        transactions_csv(&[("A", "B", 1.0), ("A", "B", f64::INFINITY)]).as_bytes(),
        &Columns::default(),
    )?;
    let err = enrich_table(&table, SessionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Mpc(MpcError::NonFiniteInput(_))
    ));
    Ok(())
}

#[tokio::test]
async fn pair_sum_overflow_aborts_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let args = args(
        &dir,
        &transactions_csv(&[("A", "B", 1e14), ("C", "D", 1.0), ("A", "B", 1e14)]),
    )?;
    let err = enrich_file(&args).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Mpc(MpcError::SumOverflow { frac_bits: 16, .. })
    ));
    assert!(!args.output.exists());
    Ok(())
}

#[tokio::test]
async fn invalid_session_config() -> Result<()> {
    let table = Table::from_reader(
        transactions_csv(&[("A", "B", 1.0)]).as_bytes(),
        &Columns::default(),
    )?;
    let err = enrich_table(&table, SessionConfig::default().with_parties(0))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Mpc(MpcError::NoParties)));
    Ok(())
}
