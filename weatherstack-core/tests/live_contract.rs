use std::path::PathBuf;

use anyhow::Result;
use weatherstack_core::{
    Config, Credential, Outcome, Suite, WeatherstackClient, config::DEFAULT_CREDENTIALS_PATH,
};

/// `api_key.json` next to this crate, or at the workspace root.
fn find_credential() -> Result<Option<Credential>> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    for dir in [manifest_dir.clone(), manifest_dir.join("..")] {
        if let Some(credential) = Credential::load(&dir.join(DEFAULT_CREDENTIALS_PATH))? {
            return Ok(Some(credential));
        }
    }
    Ok(None)
}

#[tokio::test]
async fn current_endpoint_honours_documented_contract() -> Result<()> {
    // This test requires network access and a weatherstack access key.
    if std::env::var("SKIP_INTEGRATION_TESTS").is_ok() {
        return Ok(());
    }

    let Some(credential) = find_credential()? else {
        eprintln!(
            "skipping: {DEFAULT_CREDENTIALS_PATH} not found, please create a file with the following content: {{\"api_key\": \"your_api_key\"}}"
        );
        return Ok(());
    };

    let config = Config::default();
    let report = Suite::new(WeatherstackClient::from_config(&config)?, Some(credential))
        .with_pacing(config.pacing())
        .run()
        .await;

    for case in &report.cases {
        if let Outcome::Skipped(reason) = &case.outcome {
            eprintln!("skipped {}: {reason}", case.id);
        }
    }

    let failures: Vec<String> = report
        .failures()
        .map(|c| match &c.outcome {
            Outcome::Failed(message) => format!("{}: {message}", c.id),
            _ => c.id.clone(),
        })
        .collect();

    assert!(failures.is_empty(), "contract violations:\n{}", failures.join("\n"));
    Ok(())
}
