// End-to-end lifecycle: fund creation, pooled deposits, claim transfers,
// withdrawal requests, weighted voting, and settlement against the asset.

use custody_ledger::assets::{AssetToken, InMemoryAsset};
use custody_ledger::ledger::{Amount, FundId, FundLedger, HolderId, LedgerEvent};
use custody_ledger::withdrawals::RequestStatus;
use custody_ledger::LedgerError;

const VAULT: &str = "vault";

fn holder(name: &str) -> HolderId {
    name.to_string()
}

fn deposit(
    ledger: &mut FundLedger,
    asset: &mut InMemoryAsset,
    depositor: &str,
    fund_id: FundId,
    amount: Amount,
) {
    let depositor = holder(depositor);
    asset.mint(&depositor, amount);
    asset.approve(&depositor, &holder(VAULT), amount);
    ledger
        .deposit_asset(asset, &depositor, fund_id, amount)
        .unwrap();
}

/// Claim supply must always equal what is still custodied plus what approved
/// withdrawals have released.
fn assert_conservation(ledger: &FundLedger, fund_id: FundId) {
    let fund = ledger.fund(fund_id).unwrap();
    let released: Amount = fund
        .requests
        .iter()
        .filter(|r| r.status == RequestStatus::Approved)
        .map(|r| r.amount)
        .sum();
    assert_eq!(fund.claim_token.total_supply(), fund.custodied + released);
}

#[test]
fn full_fund_lifecycle_settles_against_the_asset() {
    let mut ledger = FundLedger::new(VAULT);
    let mut asset = InMemoryAsset::new(VAULT);

    let fund_id = ledger
        .create_fund(
            &holder("mgr"),
            "School Roof",
            "Repairs for the north wing",
            "ROOF",
            vec!["ipfs://charter".to_string()],
        )
        .unwrap();

    deposit(&mut ledger, &mut asset, "alice", fund_id, 600);
    deposit(&mut ledger, &mut asset, "bob", fund_id, 300);
    deposit(&mut ledger, &mut asset, "carol", fund_id, 100);
    assert_conservation(&ledger, fund_id);
    assert_eq!(asset.balance_of(&holder(VAULT)), 1_000);

    // bob asks for materials money; a minority vote is not enough
    let materials = ledger
        .create_withdraw_request(
            &holder("bob"),
            fund_id,
            200,
            "roofing materials",
            vec!["ipfs://quote".to_string()],
        )
        .unwrap();
    let status = ledger
        .cast_vote(&mut asset, &holder("carol"), fund_id, materials, true)
        .unwrap();
    assert_eq!(status, RequestStatus::Pending);

    // alice's 600 takes the tally to 700 of 1000 and pays bob in the same call
    let status = ledger
        .cast_vote(&mut asset, &holder("alice"), fund_id, materials, true)
        .unwrap();
    assert_eq!(status, RequestStatus::Approved);
    assert_eq!(asset.balance_of(&holder("bob")), 200);
    assert_eq!(ledger.fund(fund_id).unwrap().custodied, 800);
    assert_conservation(&ledger, fund_id);

    // a second request dies on a majority-against vote without moving funds
    let scaffolding = ledger
        .create_withdraw_request(&holder("bob"), fund_id, 500, "scaffolding", vec![])
        .unwrap();
    let status = ledger
        .cast_vote(&mut asset, &holder("alice"), fund_id, scaffolding, false)
        .unwrap();
    assert_eq!(status, RequestStatus::Rejected);
    assert_eq!(asset.balance_of(&holder("bob")), 200);
    assert_conservation(&ledger, fund_id);

    // the event log tells the whole story in order
    let kinds: Vec<&str> = ledger
        .events()
        .iter()
        .map(|event| match event {
            LedgerEvent::FundCreated { .. } => "fund_created",
            LedgerEvent::AssetDeposited { .. } => "asset_deposited",
            LedgerEvent::ClaimsTransferred { .. } => "claims_transferred",
            LedgerEvent::FundClosedForDeposits { .. } => "fund_closed",
            LedgerEvent::WithdrawRequestCreated { .. } => "request_created",
            LedgerEvent::VoteCast { .. } => "vote_cast",
            LedgerEvent::RequestApproved { .. } => "request_approved",
            LedgerEvent::RequestRejected { .. } => "request_rejected",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "fund_created",
            "asset_deposited",
            "asset_deposited",
            "asset_deposited",
            "request_created",
            "vote_cast",
            "vote_cast",
            "request_approved",
            "request_created",
            "vote_cast",
            "request_rejected",
        ]
    );
}

#[test]
fn funds_do_not_contend_and_custody_stays_per_fund() {
    let mut ledger = FundLedger::new(VAULT);
    let mut asset = InMemoryAsset::new(VAULT);

    let roof = ledger
        .create_fund(&holder("mgr"), "School Roof", "", "ROOF", vec![])
        .unwrap();
    let library = ledger
        .create_fund(&holder("mgr"), "Library", "", "LIB", vec![])
        .unwrap();
    assert_eq!(ledger.num_funds(), 2);

    deposit(&mut ledger, &mut asset, "alice", roof, 100);
    deposit(&mut ledger, &mut asset, "alice", library, 40);

    // the roof fund cannot promise more than its own custody even though the
    // shared vault account holds 140
    let err = ledger
        .create_withdraw_request(&holder("alice"), roof, 120, "overreach", vec![])
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { fund_id } if fund_id == roof));

    // claim positions are scoped per fund
    assert_eq!(ledger.claim_balance(roof, &holder("alice")).unwrap(), 100);
    assert_eq!(ledger.claim_balance(library, &holder("alice")).unwrap(), 40);
}

#[test]
fn state_survives_a_json_round_trip() {
    let mut ledger = FundLedger::new(VAULT);
    let mut asset = InMemoryAsset::new(VAULT);

    let fund_id = ledger
        .create_fund(&holder("mgr"), "School Roof", "", "ROOF", vec![])
        .unwrap();
    deposit(&mut ledger, &mut asset, "alice", fund_id, 250);
    ledger
        .transfer_claims(&holder("alice"), fund_id, &holder("bob"), 50)
        .unwrap();
    ledger
        .create_withdraw_request(&holder("bob"), fund_id, 75, "supplies", vec![])
        .unwrap();

    let encoded = serde_json::to_string(&ledger).unwrap();
    let decoded: FundLedger = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, ledger);
    assert_eq!(
        decoded.snapshot().merkle_root,
        ledger.snapshot().merkle_root
    );

    let encoded_asset = serde_json::to_string(&asset).unwrap();
    let decoded_asset: InMemoryAsset = serde_json::from_str(&encoded_asset).unwrap();
    assert_eq!(decoded_asset, asset);
}

#[test]
fn closing_a_fund_still_lets_queued_requests_settle() {
    let mut ledger = FundLedger::new(VAULT);
    let mut asset = InMemoryAsset::new(VAULT);

    let fund_id = ledger
        .create_fund(&holder("mgr"), "School Roof", "", "ROOF", vec![])
        .unwrap();
    deposit(&mut ledger, &mut asset, "alice", fund_id, 100);
    let request_id = ledger
        .create_withdraw_request(&holder("alice"), fund_id, 60, "final invoice", vec![])
        .unwrap();

    ledger.close_fund(&holder("mgr"), fund_id).unwrap();

    let status = ledger
        .cast_vote(&mut asset, &holder("alice"), fund_id, request_id, true)
        .unwrap();
    assert_eq!(status, RequestStatus::Approved);
    assert_eq!(asset.balance_of(&holder("alice")), 60);
    assert_eq!(ledger.fund(fund_id).unwrap().custodied, 40);
}
