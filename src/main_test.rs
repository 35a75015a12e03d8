use super::*;

#[test]
fn parse_redirect_accepts_bare_token() {
    assert_eq!(parse_redirect("abc123").unwrap(), "abc123");
}

#[test]
fn parse_redirect_reads_fragment_token() {
    let url = "http://localhost:5000/callback#access_token=tok&token_type=Bearer&expires_in=7200";
    assert_eq!(parse_redirect(url).unwrap(), "tok");
}

#[test]
fn parse_redirect_decodes_token() {
    let url = "http://cb/#access_token=abc%2Bdef%2F0%3D&token_type=Bearer";
    assert_eq!(parse_redirect(url).unwrap(), "abc+def/0=");
}

#[test]
fn parse_redirect_reports_provider_error() {
    let url = "http://localhost:5000/callback#error=access_denied&error_description=User%20closed%20the%20window";
    assert!(matches!(
        parse_redirect(url),
        Err(AuthFlowError::Rejected(e)) if e == "access_denied: User closed the window"
    ));
}

#[test]
fn parse_redirect_error_without_description() {
    let url = "http://localhost:5000/callback#error=login_required";
    assert!(matches!(parse_redirect(url), Err(AuthFlowError::Rejected(e)) if e == "login_required"));
}

#[test]
fn parse_redirect_without_token_is_rejected() {
    let url = "http://localhost:5000/callback#token_type=Bearer";
    assert!(matches!(parse_redirect(url), Err(AuthFlowError::Rejected(_))));
}

#[test]
fn parse_redirect_empty_is_cancel() {
    assert!(matches!(parse_redirect(""), Err(AuthFlowError::Cancelled)));
}

#[test]
fn cli_parses_claim_command() {
    let cli = Cli::try_parse_from(["faucet", "--base-url", "http://faucet.test", "claim", "0xabc"]).unwrap();
    assert_eq!(cli.base_url, "http://faucet.test");
    assert!(matches!(cli.command, Command::Claim { address } if address == "0xabc"));
}

#[test]
fn cli_parses_session_cookie() {
    let cli = Cli::try_parse_from(["faucet", "--session-cookie", "auth-session=MTcw", "info"]).unwrap();
    assert_eq!(cli.session_cookie.as_deref(), Some("auth-session=MTcw"));
    assert!(matches!(cli.command, Command::Info));
}
