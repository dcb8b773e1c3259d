use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn affirmative_answers() {
    assert!(is_affirmative("y\n"));
    assert!(is_affirmative(" YES "));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("no"));
}

#[test]
fn decisions_render_paths() {
    assert_eq!(describe_decision(&GuardDecision::Redirect(Route::SignIn)), "redirect /signin");
    assert_eq!(describe_decision(&GuardDecision::Render(Route::Recipe(3))), "render /recipes/3");
    assert_eq!(describe_decision(&GuardDecision::Loading), "loading");
}

#[test]
fn checkout_flags_parse() {
    let cli = Cli::try_parse_from(["foodgram", "checkout", "--service", "barbora", "-y"]).unwrap();
    assert!(matches!(cli.command, Command::Checkout { service: DeliveryService::Barbora, yes: true }));
}

#[test]
fn every_advertised_service_parses() {
    let help = service_help();
    for service in DeliveryService::ALL {
        assert!(help.contains(service.value()));
        let cli = Cli::try_parse_from(["foodgram", "checkout", "--service", service.value()]).unwrap();
        assert!(matches!(cli.command, Command::Checkout { service: parsed, .. } if parsed == service));
    }
}

#[test]
fn service_spellings_are_forgiving() {
    for raw in ["bolt_market", "BoltMarket", "bolt-market"] {
        assert_eq!(parse_service(raw), Ok(DeliveryService::BoltMarket));
    }
    assert_eq!(parse_service("Cash&Carry"), Ok(DeliveryService::CashCarry));
    assert_eq!(parse_service("cash_carry"), Ok(DeliveryService::CashCarry));
    assert!(Cli::try_parse_from(["foodgram", "checkout", "--service", "wolt"]).is_err());
}

#[test]
fn suggest_joins_words() {
    let cli = Cli::try_parse_from(["foodgram", "suggest", "eggs,", "milk"]).unwrap();
    let Command::Suggest { ingredients } = cli.command else { panic!("expected suggest") };
    assert_eq!(ingredients.join(" "), "eggs, milk");
}
