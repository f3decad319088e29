//! A missing *required* configuration variable is a
//! startup-time error, never a runtime failure mid-job.

use assert_cmd::Command;

#[test]
fn refuses_to_start_without_an_anthropic_api_key() {
    let mut cmd = Command::cargo_bin("pf-server").expect("pf-server binary should be built by the workspace");
    cmd.env_remove("ANTHROPIC_API_KEY").env_remove("OPENAI_API_KEY").env("OPENAI_API_KEY", "test-key");

    cmd.assert().failure();
}
