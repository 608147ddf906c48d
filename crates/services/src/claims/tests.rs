// Path: crates/services/src/claims/tests.rs

use super::*;
use crate::testing::{Fixture, CHAIN, CLIENT_SEED, FIRST_SERVICER_SEED, SERVICER_STAKE};
use viper_api::ledger::Ledger;
use viper_crypto::sign::eddsa::Ed25519KeyPair;
use viper_crypto::signing::{sign_relay_response, sign_report};
use viper_state::memory::MemoryState;
use viper_state::merkle::{generate_proof, generate_root};
use viper_state::random::pseudorandom_index;
use viper_test_utils::keys::{aat_for, keypair, signed_relay};
use viper_test_utils::{assert_err, assert_ok, MockChain};
use viper_types::app::{
    ChallengeProof, HashRange, MsgProof, MsgSubmitReportCard, Proof, QosReport, RelayResponse, Score,
    Session,
};
use viper_types::error::ViperError;

struct Setup {
    fx: Fixture,
    chain: MockChain,
    keeper: ClaimsKeeper,
    header: SessionHeader,
    session: Arc<Session>,
    servicer: Ed25519KeyPair,
    requestor: Ed25519KeyPair,
}

impl Setup {
    fn new(servicers: u8, requestor_stake: u64, params: ViperParams) -> Self {
        let mut fx = Fixture::new(params).with_servicers(servicers);
        let requestor = fx.stake_requestor(requestor_stake, None);
        let header = SessionHeader::new(requestor.viper_public_key(), CHAIN, 1);
        let chain = MockChain::new();
        chain.commit(1, &fx.state);
        let keeper = ClaimsKeeper::new(fx.params.clone(), fx.sessions.clone(), fx.servicers.clone());
        let session = assert_ok!(fx.sessions.session(&chain, &fx.state, &fx.params, &header));
        let servicer = key_of(servicers, &session.servicers[0]);
        Self {
            fx,
            chain,
            keeper,
            header,
            session,
            servicer,
            requestor,
        }
    }

    fn standard() -> Self {
        Self::new(5, 100_000_000, ViperParams::default())
    }

    fn advance_to(&self, height: u64) {
        self.chain.commit(height, &self.fx.state);
    }

    fn relay_leaves(&self, servicer: &Ed25519KeyPair, n: u64) -> Vec<Proof> {
        let client = keypair(CLIENT_SEED);
        let aat = assert_ok!(aat_for(&self.requestor, &client));
        (1..=n)
            .map(|entropy| {
                let relay = assert_ok!(signed_relay(
                    &client,
                    &aat,
                    &self.header,
                    servicer,
                    entropy,
                    2,
                    r#"{"method":"eth_blockNumber"}"#
                ));
                Proof::Relay(relay.proof)
            })
            .collect()
    }

    fn claim_msg(&self, from: Address, leaves: &[Proof], kind: EvidenceType) -> MsgClaim {
        MsgClaim {
            header: self.header.clone(),
            merkle_root: assert_ok!(generate_root(leaves)),
            total_proofs: leaves.len() as u64,
            from_address: from,
            evidence_type: Some(kind),
            expiration_height: 0,
        }
    }

    fn proof_msg(&self, leaves: &[Proof], reveal_height: u64) -> MsgProof {
        let index = pseudorandom_index(
            leaves.len() as u64,
            &self.header,
            &MockChain::hash_at(reveal_height),
        );
        let leaf = leaves[index as usize].clone();
        MsgProof {
            merkle_proof: assert_ok!(generate_proof(leaves, index)),
            evidence_type: Some(leaf.evidence_type()),
            leaf,
        }
    }

    fn claim(&mut self, height: u64, leaves: &[Proof]) -> Result<Claim, ViperError> {
        self.advance_to(height);
        let msg = self.claim_msg(self.servicer.address(), leaves, EvidenceType::Relay);
        self.keeper.set_claim(&mut self.fx.state, &ctx(&self.chain, height), &msg)
    }
}

fn ctx(chain: &MockChain, height: u64) -> TxContext<'_> {
    TxContext {
        block_height: height,
        block_time: MockChain::time_at(height),
        signer: Address::default(),
        chain,
    }
}

fn key_of(servicers: u8, address: &Address) -> Ed25519KeyPair {
    (0..servicers)
        .map(|i| keypair(FIRST_SERVICER_SEED + i))
        .find(|k| k.address() == *address)
        .unwrap_or_else(|| panic!("no fixture key for {}", address))
}

#[test]
fn max_possible_relays_splits_quota() {
    let mut requestor = Requestor {
        address: Address([1; 20]),
        public_key: Default::default(),
        jailed: false,
        status: viper_types::app::StakeStatus::Staked,
        chains: vec![CHAIN.into()],
        geo_zones: vec![],
        staked_tokens: 10_000_000,
        max_relays: 10,
        num_servicers: None,
        unstaking_completion_time: 0,
    };
    assert_eq!(max_possible_relays(&requestor, 5), 2);
    requestor.chains.push("0002".into());
    assert_eq!(max_possible_relays(&requestor, 5), 1);
    requestor.chains.clear();
    assert_eq!(max_possible_relays(&requestor, 5), 0);
}

#[test]
fn claim_is_accepted_only_after_the_session_ends() {
    let mut s = Setup::standard();
    let leaves = s.relay_leaves(&s.servicer.clone(), 6);

    // The session opened at 1 ends at 4.
    assert_eq!(s.claim(4, &leaves), Err(ViperError::SessionNotOver));
    let claim = assert_ok!(s.claim(5, &leaves));
    assert_eq!(claim.expiration_height, 5 + 24 * 4);
    assert_eq!(claim.merkle_root.lower, 0);
    assert_eq!(claim.merkle_root.upper, 6);

    assert_eq!(s.claim(6, &leaves), Err(ViperError::ClaimAlreadyExists));
    let stored = assert_ok!(s.keeper.get_claim(&s.fx.state, &s.servicer.address(), &s.header, EvidenceType::Relay));
    assert_eq!(stored, Some(claim));
}

#[test]
fn claim_after_the_reveal_height_expires() {
    let mut s = Setup::standard();
    let leaves = s.relay_leaves(&s.servicer.clone(), 6);
    // Reveal height is 1 + 3 * 4 = 13.
    assert_eq!(s.claim(17, &leaves), Err(ViperError::ExpiredProofs));
    assert_eq!(s.claim(14, &leaves), Err(ViperError::ExpiredProofs));
    assert_ok!(s.claim(13, &leaves));
}

#[test]
fn claim_over_quota_is_over_service() {
    // 10 relays across 1 chain and 5 servicers leaves 2 per servicer.
    let mut s = Setup::new(5, 10_000_000, ViperParams::default());
    let leaves = s.relay_leaves(&s.servicer.clone(), 3);
    assert_eq!(s.claim(5, &leaves), Err(ViperError::OverService { count: 3, max: 2 }));
    assert_ok!(s.claim(5, &leaves[..2]));
}

#[test]
fn header_variants_share_one_budget() {
    // 10 relays across a session of 5.
    let mut s = Setup::new(5, 10_000_000, ViperParams::default());
    s.advance_to(5);
    let client = keypair(CLIENT_SEED);
    let aat = assert_ok!(aat_for(&s.requestor, &client));

    let mut variants: Vec<SessionHeader> = (1..=5)
        .map(|size| SessionHeader {
            num_servicers: Some(size),
            ..s.header.clone()
        })
        .collect();
    variants.push(SessionHeader {
        geo_zone: Some("eu".into()),
        ..s.header.clone()
    });

    for variant in &variants {
        // No servicer advertises a zone, so the zoned variant reuses the plain draw.
        let members = match s.fx.sessions.session(&s.chain, &s.fx.state, &s.fx.params, variant) {
            Ok(session) => session.servicers.clone(),
            Err(_) => s.session.servicers.clone(),
        };
        let allowance = 10 / variant.num_servicers.unwrap_or(5);
        for member in &members {
            let servicer = key_of(5, member);
            let leaves: Vec<Proof> = (1..=allowance)
                .map(|entropy| {
                    let relay = assert_ok!(signed_relay(&client, &aat, variant, &servicer, entropy, 2, "{}"));
                    Proof::Relay(relay.proof)
                })
                .collect();
            let mut msg = s.claim_msg(*member, &leaves, EvidenceType::Relay);
            msg.header = variant.clone();
            let err = assert_err!(s.keeper.set_claim(&mut s.fx.state, &ctx(&s.chain, 5), &msg));
            assert!(matches!(err, ViperError::InvalidSession(_)), "{:?}: {}", variant, err);
        }
    }

    let mut claimed = 0;
    for member in s.session.servicers.clone() {
        let servicer = key_of(5, &member);
        let leaves = s.relay_leaves(&servicer, 2);
        let msg = s.claim_msg(member, &leaves, EvidenceType::Relay);
        claimed += assert_ok!(s.keeper.set_claim(&mut s.fx.state, &ctx(&s.chain, 5), &msg)).total_proofs;
    }
    assert_eq!(claimed, 10);
    let stored = assert_ok!(s.keeper.all_claims(&s.fx.state));
    assert_eq!(stored.iter().map(|c| c.total_proofs).sum::<u64>(), 10);
}

#[test]
fn claim_below_minimum_proofs_fails() {
    let params = ViperParams {
        minimum_proofs: 3,
        ..ViperParams::default()
    };
    let mut s = Setup::new(5, 100_000_000, params);
    let leaves = s.relay_leaves(&s.servicer.clone(), 2);
    assert_eq!(
        s.claim(5, &leaves),
        Err(ViperError::InsufficientProofs { got: 2, min: 3 })
    );
}

#[test]
fn claim_requires_session_membership_and_stake() {
    let mut s = Setup::new(6, 100_000_000, ViperParams::default());
    s.advance_to(5);
    let outsider = (0..6)
        .map(|i| keypair(FIRST_SERVICER_SEED + i))
        .find(|k| !s.session.contains_servicer(&k.address()))
        .map(|k| k.address());
    let Some(outsider) = outsider else {
        panic!("six candidates for five seats leave one out");
    };
    let leaves = s.relay_leaves(&s.servicer.clone(), 2);

    let msg = s.claim_msg(outsider, &leaves, EvidenceType::Relay);
    assert_eq!(
        s.keeper.validate_claim(&s.fx.state, &ctx(&s.chain, 5), &msg),
        Err(ViperError::NotSessionServicer)
    );

    let stranger = keypair(99).address();
    let msg = s.claim_msg(stranger, &leaves, EvidenceType::Relay);
    assert_eq!(
        s.keeper.validate_claim(&s.fx.state, &ctx(&s.chain, 5), &msg),
        Err(ViperError::ServicerNotFound(stranger.to_hex()))
    );

    let mut unsupported = s.claim_msg(s.servicer.address(), &leaves, EvidenceType::Relay);
    unsupported.header.chain = "00ff".into();
    assert_eq!(
        s.keeper.validate_claim(&s.fx.state, &ctx(&s.chain, 5), &unsupported),
        Err(ViperError::UnsupportedBlockchain("00ff".into()))
    );
}

#[test]
fn proof_of_the_selected_leaf_mints_rewards() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 6);
    assert_ok!(s.claim(5, &leaves));
    s.advance_to(14);

    let msg = s.proof_msg(&leaves, 13);
    let before = s.fx.ledger.balance(&servicer.address());

    let premature = assert_err!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 13), &msg));
    assert_eq!(premature, TransactionError::Viper(ViperError::PrematureProof));

    let outcome = assert_ok!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 14), &msg));
    assert_eq!(outcome, ProofOutcome::Rewarded { minted: 6 });
    assert_eq!(s.fx.ledger.balance(&servicer.address()), before + 6);
    assert!(assert_ok!(s.keeper.claims_of(&s.fx.state, &servicer.address())).is_empty());

    let again = assert_err!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 15), &msg));
    assert_eq!(again, TransactionError::Viper(ViperError::ClaimNotFound));
}

#[test]
fn proof_of_another_leaf_is_invalid() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 6);
    assert_ok!(s.claim(5, &leaves));
    s.advance_to(14);

    let selected = pseudorandom_index(6, &s.header, &MockChain::hash_at(13));
    let other = (selected + 1) % 6;
    let msg = MsgProof {
        merkle_proof: assert_ok!(generate_proof(&leaves, other)),
        leaf: leaves[other as usize].clone(),
        evidence_type: Some(EvidenceType::Relay),
    };
    let err = assert_err!(s.keeper.validate_proof(&s.fx.state, &ctx(&s.chain, 14), &msg));
    assert!(matches!(err, ViperError::InvalidProof(_)));

    let mut short = s.proof_msg(&leaves, 13);
    short.merkle_proof.hash_ranges.pop();
    let err = assert_err!(s.keeper.validate_proof(&s.fx.state, &ctx(&s.chain, 14), &short));
    assert!(matches!(err, ViperError::InvalidProof(_)));

    let mut tampered = s.proof_msg(&leaves, 13);
    tampered.merkle_proof.hash_ranges[1].hash = [0xaa; 32];
    let err = assert_err!(s.keeper.validate_proof(&s.fx.state, &ctx(&s.chain, 14), &tampered));
    assert!(matches!(err, ViperError::InvalidMerkleVerify(_)));

    // Nothing was settled.
    assert_eq!(assert_ok!(s.keeper.claims_of(&s.fx.state, &servicer.address())).len(), 1);
}

#[test]
fn proof_leaf_must_match_the_target() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 6);
    assert_ok!(s.claim(5, &leaves));
    s.advance_to(14);

    // A valid path for the selected leaf carrying a different signed relay.
    let mut swapped = s.proof_msg(&leaves, 13);
    let selected = swapped.merkle_proof.target_index as usize;
    swapped.leaf = leaves[(selected + 1) % 6].clone();
    let err = assert_err!(s.keeper.validate_proof(&s.fx.state, &ctx(&s.chain, 14), &swapped));
    assert!(matches!(err, ViperError::InvalidProof(_)));

    let fresh = s.relay_leaves(&servicer, 7).pop();
    let Some(fresh) = fresh else {
        panic!("no leaf");
    };
    swapped.leaf = fresh;
    let err = assert_err!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 14), &swapped));
    assert!(matches!(err, TransactionError::Viper(ViperError::InvalidProof(_))));

    assert_eq!(assert_ok!(s.keeper.claims_of(&s.fx.state, &servicer.address())).len(), 1);
    let honest = s.proof_msg(&leaves, 13);
    let outcome = assert_ok!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 14), &honest));
    assert_eq!(outcome, ProofOutcome::Rewarded { minted: 6 });
}

#[test]
fn replayed_path_burns_the_claimant() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 6);
    assert_ok!(s.claim(5, &leaves));
    s.advance_to(14);

    let mut msg = s.proof_msg(&leaves, 13);
    msg.merkle_proof.hash_ranges[0] = msg.merkle_proof.target;
    let err = assert_err!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 14), &msg));
    assert_eq!(err, TransactionError::Viper(ViperError::ReplayAttack));

    assert!(assert_ok!(s.keeper.claims_of(&s.fx.state, &servicer.address())).is_empty());
    assert_eq!(s.fx.servicers.burned(&s.fx.state, &servicer.address()), Ok(6 * 3));
    let record: Servicer = assert_ok!(crate::staking::require_actor(&s.fx.state, &servicer.address()));
    assert_eq!(record.staked_tokens, SERVICER_STAKE - 18);
}

#[test]
fn mature_and_expired_claims() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 4);
    assert_ok!(s.claim(5, &leaves));

    assert!(assert_ok!(s.keeper.get_mature_claims(&s.fx.state, &servicer.address(), 13)).is_empty());
    assert_eq!(assert_ok!(s.keeper.get_mature_claims(&s.fx.state, &servicer.address(), 14)).len(), 1);

    assert_eq!(s.keeper.delete_expired_claims(&mut s.fx.state, 100), Ok(0));
    assert_eq!(s.keeper.delete_expired_claims(&mut s.fx.state, 101), Ok(1));
    let after_once = s.fx.state.clone();
    assert_eq!(s.keeper.delete_expired_claims(&mut s.fx.state, 101), Ok(0));
    assert_eq!(s.fx.state, after_once);
}

#[test]
fn challenge_slashes_the_minority_servicer() {
    let mut s = Setup::standard();
    let members: Vec<Ed25519KeyPair> = s.session.servicers.iter().map(|a| key_of(5, a)).collect();
    let (reporter, agreeing, accused) = (&members[0], &members[1], &members[2]);

    let client = keypair(CLIENT_SEED);
    let aat = assert_ok!(aat_for(&s.requestor, &client));
    let respond = |servicer: &Ed25519KeyPair, entropy: u64, body: &str| {
        let relay = assert_ok!(signed_relay(&client, &aat, &s.header, servicer, entropy, 2, "{}"));
        let mut response = RelayResponse {
            response: body.to_string(),
            signature: String::new(),
            proof: relay.proof,
        };
        assert_ok!(sign_relay_response(servicer, &mut response));
        response
    };
    let leaf = Proof::Challenge(ChallengeProof {
        majority_responses: vec![respond(reporter, 1, "0x10"), respond(agreeing, 2, "0x10")],
        minority_response: respond(accused, 3, "0x99"),
        reporter_address: reporter.address(),
    });
    let leaves = vec![leaf];

    s.advance_to(5);
    let claim_msg = s.claim_msg(reporter.address(), &leaves, EvidenceType::Challenge);
    assert_ok!(s.keeper.set_claim(&mut s.fx.state, &ctx(&s.chain, 5), &claim_msg));

    s.advance_to(14);
    let msg = s.proof_msg(&leaves, 13);
    assert_eq!(msg.merkle_proof.target_index, 0);
    let reporter_before = s.fx.ledger.balance(&reporter.address());
    let outcome = assert_ok!(s.keeper.handle_proof(&mut s.fx.state, &mut s.fx.ledger, &ctx(&s.chain, 14), &msg));
    assert_eq!(
        outcome,
        ProofOutcome::Slashed {
            burned: 1_000_000,
            reward: 100_000
        }
    );
    assert_eq!(s.fx.ledger.balance(&reporter.address()), reporter_before + 100_000);
    let slashed: Servicer = assert_ok!(crate::staking::require_actor(&s.fx.state, &accused.address()));
    assert_eq!(slashed.staked_tokens, SERVICER_STAKE - 1_000_000);
}

fn report(fisherman: &Ed25519KeyPair, samples: u64) -> QosReport {
    let mut report = QosReport {
        latency_score: Score::ONE,
        availability_score: Score::from_ratio(9, 10),
        reliability_score: Score::ONE,
        sample_root: HashRange {
            hash: [7; 32],
            lower: 0,
            upper: samples,
        },
        nonce: 1,
        signature: String::new(),
        first_sample_timestamp: 1_700_000_000_000,
        block_height: 4,
    };
    assert_ok!(sign_report(fisherman, &mut report));
    report
}

#[test]
fn report_cards_follow_the_submission_window() {
    let mut s = Setup::new(6, 100_000_000, ViperParams::default());
    s.advance_to(17);
    let fisherman = key_of(6, &s.session.fishermen[0]);
    let rated = s.session.servicers[0];
    let msg = MsgSubmitReportCard {
        header: s.header.clone(),
        servicer: rated,
        fisherman: fisherman.address(),
        report: report(&fisherman, 10),
        evidence_type: Some(EvidenceType::FishermanTest),
    };

    assert_eq!(
        s.keeper.validate_report_card(&s.fx.state, &ctx(&s.chain, 4), &msg),
        Err(ViperError::SessionNotOver)
    );
    // Opening block 1 plus a window of 3 sessions, the claim reveal height.
    assert_eq!(
        s.keeper.validate_report_card(&s.fx.state, &ctx(&s.chain, 14), &msg),
        Err(ViperError::ExpiredProofs)
    );

    let mut thin = msg.clone();
    thin.report = report(&fisherman, 9);
    assert!(matches!(
        s.keeper.validate_report_card(&s.fx.state, &ctx(&s.chain, 5), &thin),
        Err(ViperError::InvalidReportCard(_))
    ));

    let mut forged = msg.clone();
    forged.report = report(&keypair(99), 10);
    assert!(matches!(
        s.keeper.validate_report_card(&s.fx.state, &ctx(&s.chain, 5), &forged),
        Err(ViperError::InvalidSignature(_))
    ));

    let impostor = key_of(6, &s.session.servicers[1]);
    let mut not_fisherman = msg.clone();
    not_fisherman.fisherman = impostor.address();
    not_fisherman.report = report(&impostor, 10);
    assert_eq!(
        s.keeper.validate_report_card(&s.fx.state, &ctx(&s.chain, 5), &not_fisherman),
        Err(ViperError::NotSessionFisherman)
    );

    let card = assert_ok!(s.keeper.set_report_card(&mut s.fx.state, &ctx(&s.chain, 13), &msg));
    assert_eq!(card.expiration_height, 13 + 24 * 4);
    assert!(matches!(
        s.keeper.set_report_card(&mut s.fx.state, &ctx(&s.chain, 13), &msg),
        Err(ViperError::InvalidReportCard(_))
    ));
    assert_eq!(
        assert_ok!(s.keeper.get_report_card(&s.fx.state, &rated, &fisherman.address(), &s.header)),
        Some(card)
    );

    assert_eq!(s.keeper.delete_expired_report_cards(&mut s.fx.state, 112), Ok(1));
    assert!(assert_ok!(s.keeper.all_report_cards(&s.fx.state)).is_empty());
}

#[test]
fn genesis_round_trips_claims_and_cards() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 3);
    assert_ok!(s.claim(5, &leaves));

    let exported = assert_ok!(s.keeper.export_genesis(&s.fx.state));
    assert_eq!(exported.claims.len(), 1);

    let mut fresh = MemoryState::new();
    assert_ok!(s.keeper.init_genesis(&mut fresh, &exported));
    assert_eq!(assert_ok!(s.keeper.export_genesis(&fresh)), exported);
}

#[test]
fn end_block_drops_expired_entries() {
    let mut s = Setup::standard();
    let servicer = s.servicer.clone();
    let leaves = s.relay_leaves(&servicer, 3);
    assert_ok!(s.claim(5, &leaves));
    s.advance_to(101);
    let end = ctx(&s.chain, 101);
    assert_ok!(s.keeper.on_end_block(&mut s.fx.state, &mut s.fx.ledger, &end));
    assert!(assert_ok!(s.keeper.all_claims(&s.fx.state)).is_empty());
}
