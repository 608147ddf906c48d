// Path: crates/node/tests/fisherman_e2e.rs
//! A fisherman drawn into a session samples its servicers and files one
//! report card per servicer after the session ends.

mod common;

use common::{is_report, service_url, World, FIRST_SERVICER_SEED, REQUESTOR_STAKE};
use viper_node::fisherman::sample_key;
use viper_node::Node;
use viper_test_utils::keys::{keypair, payload};
use viper_test_utils::{assert_err, assert_ok};
use viper_types::app::{Address, EvidenceType, Score};
use viper_types::config::ViperParams;
use viper_types::error::ViperError;

fn world(minimum_sample_relays: u64) -> World {
    let params = ViperParams {
        minimum_sample_relays,
        ..ViperParams::default()
    };
    // Six staked servicers: five serve the session, one is left to audit it.
    World::new(params, 6, REQUESTOR_STAKE)
}

fn fisherman_of(world: &World) -> &Node {
    let session = world.session(1);
    assert_eq!(session.fishermen.len(), 1);
    world.node(&session.fishermen[0])
}

fn seed_of(address: &Address) -> u8 {
    match (0..6u8)
        .map(|i| FIRST_SERVICER_SEED + i)
        .find(|s| keypair(*s).address() == *address)
    {
        Some(s) => s,
        None => panic!("unknown servicer {}", address),
    }
}

#[tokio::test]
async fn samples_become_report_cards() {
    let mut world = world(2);
    let session = world.session(1);
    let fisherman = fisherman_of(&world).address();
    let sampler = world.node(&fisherman).fisherman().clone();

    assert_eq!(assert_ok!(sampler.audited_sessions()).len(), 1);
    assert_eq!(sampler.sample_round().await, 5);
    assert_eq!(sampler.sample_round().await, 5);
    for servicer in &session.servicers {
        let key = sample_key(&world.header(1), *servicer);
        assert_eq!(world.node(&fisherman).ctx().evidence.count(&key), 2);
        // Samples are not billed to the requestor.
        assert!(world
            .node(servicer)
            .ctx()
            .evidence
            .iter()
            .iter()
            .all(|i| i.key.kind != EvidenceType::Relay));
    }

    world.advance_to(9).await;
    let reports = world.outcomes(is_report);
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.is_ok()), "report rejected: {:?}", reports);
    for servicer in &session.servicers {
        let card = assert_ok!(world
            .router
            .claims()
            .get_report_card(&world.state, servicer, &fisherman, &world.header(1)));
        let Some(card) = card else {
            panic!("no report card for {}", servicer);
        };
        assert_eq!(card.report.availability_score, Score::ONE);
        assert_eq!(card.report.reliability_score, Score::ONE);
        assert_eq!(card.report.sample_root.upper, 2);
    }
    assert!(world.node(&fisherman).ctx().evidence.iter().is_empty());
}

#[tokio::test]
async fn unreachable_servicers_score_zero() {
    let mut world = world(2);
    let session = world.session(1);
    let fisherman = fisherman_of(&world).address();
    let silent = session.servicers[0];
    world.client.unregister(&service_url(seed_of(&silent)));

    let sampler = world.node(&fisherman).fisherman().clone();
    // Missed samples are still recorded.
    assert_eq!(sampler.sample_round().await, 5);
    assert_eq!(sampler.sample_round().await, 5);

    world.advance_to(9).await;
    let card = assert_ok!(world
        .router
        .claims()
        .get_report_card(&world.state, &silent, &fisherman, &world.header(1)));
    let Some(card) = card else {
        panic!("no report card for the silent servicer");
    };
    assert_eq!(card.report.availability_score, Score::ZERO);
    assert_eq!(card.report.latency_score, Score::ZERO);

    let answered = session.servicers[1];
    let card = assert_ok!(world
        .router
        .claims()
        .get_report_card(&world.state, &answered, &fisherman, &world.header(1)));
    assert_eq!(card.map(|c| c.report.availability_score), Some(Score::ONE));
}

#[tokio::test]
async fn too_few_samples_are_dropped_without_a_report() {
    let mut world = world(10);
    let fisherman = fisherman_of(&world).address();
    let sampler = world.node(&fisherman).fisherman().clone();
    assert_eq!(sampler.sample_round().await, 5);

    world.advance_to(9).await;
    assert!(world.outcomes(is_report).is_empty());
    assert!(world.node(&fisherman).ctx().evidence.iter().is_empty());
}

#[tokio::test]
async fn only_drawn_fishermen_may_sample() {
    let world = world(2);
    let session = world.session(1);
    let member = world.node(&session.servicers[0]);
    assert!(assert_ok!(member.fisherman().audited_sessions()).is_empty());
    assert_eq!(member.fisherman().sample_round().await, 0);

    // A session servicer posing as the fisherman is turned away.
    let target = world.node(&session.servicers[1]);
    let relay = assert_ok!(member.fisherman().sample_relay(
        &world.header(1),
        target.ctx().public_key(),
        payload(r#"{"method":"eth_blockNumber"}"#)
    ));
    assert_eq!(
        assert_err!(target.relay().handle_relay(relay).await),
        ViperError::NotSessionFisherman
    );
}
