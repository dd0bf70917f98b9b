use csv_mapper::naming::{NamingPolicies, NamingPolicy, pascal_to_snake, snake_to_pascal};
use proptest::prelude::*;

fn every_policy() -> Vec<NamingPolicy> {
    let mut policies = NamingPolicy::builtins();
    policies.push(NamingPolicy::replace(" ", "_").expect("valid pattern"));
    policies.push(NamingPolicy::custom(|name| name.to_uppercase()));
    policies
}

#[test]
fn empty_names_stay_empty_under_every_policy() {
    for policy in every_policy() {
        assert_eq!(policy.apply(""), "", "policy {policy}");
    }
}

#[test]
fn fresh_chain_matches_exactly() {
    let chain = NamingPolicies::new();
    let header = ["Name", "time_of_day"];
    let lookup = |candidate: &str| header.iter().position(|h| *h == candidate);
    assert_eq!(chain.first_match("Name", lookup), Some(0));
    assert_eq!(chain.first_match("TimeOfDay", lookup), None);

    let chain = chain.add_policy(NamingPolicy::PascalToSnake);
    assert_eq!(chain.first_match("TimeOfDay", lookup), Some(1));
}

#[test]
fn with_policy_replaces_the_chain() {
    let chain = NamingPolicies::new()
        .add_policy(NamingPolicy::SuppressSpaces)
        .with_policy(NamingPolicy::PascalToSnake);
    let labels = chain.iter().map(NamingPolicy::label).collect::<Vec<_>>();
    assert_eq!(labels, vec!["pascal-to-snake"]);
}

#[test]
fn first_registered_match_wins() {
    let chain = NamingPolicies::new()
        .with_policy(NamingPolicy::SnakeCase)
        .add_policy(NamingPolicy::KebabCase);
    let header = ["order-date", "order_date"];
    let found = chain.first_match("OrderDate", |c| header.iter().position(|h| *h == c));
    assert_eq!(found, Some(1));
}

proptest! {
    #[test]
    fn pascal_names_survive_a_snake_round_trip(name in "[A-Z][A-Za-z0-9]{0,16}") {
        let snake = pascal_to_snake(&name);
        prop_assert!(!snake.chars().any(|c| c.is_ascii_uppercase()));
        prop_assert_eq!(snake_to_pascal(&snake), name.as_str());
    }

    #[test]
    fn policies_are_total(name in "\\PC{0,24}") {
        for policy in every_policy() {
            let _ = policy.apply(&name);
        }
    }

    #[test]
    fn exact_policy_is_identity(name in "\\PC{0,24}") {
        prop_assert_eq!(NamingPolicy::Exact.apply(&name), name.as_str());
    }
}
