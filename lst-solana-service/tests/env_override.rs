use lst_solana_service::config::load_config;
use solana_sdk::commitment_config::CommitmentLevel;
use std::io::Write;

// Kept in its own test binary: environment variables are process-wide.
#[test]
fn test_environment_overrides_single_word_keys() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(
        br#"
[settlement.solana]
rpc-url = "http://localhost:8899"
commitment = "confirmed"

[service.log]
level = "info"
"#,
    )?;

    std::env::set_var("LST__SETTLEMENT__SOLANA__COMMITMENT", "finalized");
    std::env::set_var("LST__SERVICE__LOG__LEVEL", "debug");
    let config = load_config(file.path().to_str().expect("utf-8 temp path"));
    std::env::remove_var("LST__SETTLEMENT__SOLANA__COMMITMENT");
    std::env::remove_var("LST__SERVICE__LOG__LEVEL");
    let config = config?;

    assert_eq!(config.settlement.solana.commitment, CommitmentLevel::Finalized);
    assert_eq!(config.service.log.level, "debug");
    assert_eq!(config.settlement.solana.rpc_url, "http://localhost:8899");
    Ok(())
}
