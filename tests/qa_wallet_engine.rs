use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use walletcore::{
    AccountId, EngineConfig, TransferEngine, TxDirection, TxStatus, WalletError,
};

fn engine() -> Arc<TransferEngine> {
    Arc::new(TransferEngine::new(&EngineConfig::default()))
}

/// Helper: open an account and seed it with a deposit
async fn funded(engine: &TransferEngine, amount: u64) -> AccountId {
    let id = engine.open_account();
    if amount > 0 {
        engine.deposit(id, amount).await.unwrap();
    }
    id
}

#[tokio::test]
async fn qa_deposit_into_empty_account() {
    let engine = engine();
    let owner = engine.open_account();

    // Deposit 100 into a balance of 0 -> new balance 100
    let receipt = engine.deposit(owner, 100).await.unwrap();
    assert_eq!(receipt.new_balance, 100);

    let snapshot = engine.balance_of(owner).unwrap();
    assert_eq!(snapshot.available, 100);
    assert_eq!(snapshot.book, 100);

    // Exactly one journal record: completed credit of 100
    assert_eq!(engine.journal().len(), 1);
    let record = engine.get_transaction(owner, &receipt.reference).unwrap();
    assert_eq!(record.amount, 100);
    assert_eq!(record.new_balance, 100);
    assert_eq!(record.direction, TxDirection::Credit);
    assert_eq!(record.status, TxStatus::Completed);
}

#[tokio::test]
async fn qa_withdraw_insufficient_funds_is_all_or_nothing() {
    let engine = engine();
    let owner = funded(&engine, 100).await;
    let before = engine.balance_of(owner).unwrap();
    let journal_before = engine.journal().len();

    // Withdraw 150 from a balance of 100 -> typed failure with the
    // untouched balance attached for display
    let err = engine.withdraw(owner, 150).await.unwrap_err();
    assert_eq!(err, WalletError::InsufficientFunds { available: 100 });

    // nothing mutated, nothing journaled
    assert_eq!(engine.balance_of(owner).unwrap(), before);
    assert_eq!(engine.journal().len(), journal_before);
}

#[tokio::test]
async fn qa_withdraw_updates_balance_and_journal() {
    let engine = engine();
    let owner = funded(&engine, 100).await;

    let receipt = engine.withdraw(owner, 60).await.unwrap();
    assert_eq!(receipt.new_balance, 40);

    let record = engine.get_transaction(owner, &receipt.reference).unwrap();
    assert_eq!(record.direction, TxDirection::Debit);
    assert_eq!(record.amount, 60);
    assert_eq!(record.new_balance, 40);
}

#[tokio::test]
async fn qa_transfer_between_accounts() {
    let engine = engine();
    let sender = funded(&engine, 200).await;
    let recipient = engine.open_account();

    // Transfer 50: A 200 -> 150, B 0 -> 50
    let receipt = engine.transfer(sender, recipient, 50).await.unwrap();
    assert_eq!(receipt.sender_new_balance, 150);
    assert_eq!(receipt.recipient_new_balance, 50);

    assert_eq!(engine.balance_of(sender).unwrap().available, 150);
    assert_eq!(engine.balance_of(recipient).unwrap().available, 50);

    // Two journal records share the reference, one per side, each with
    // its own post-mutation balance
    let debit = engine.get_transaction(sender, &receipt.reference).unwrap();
    let credit = engine
        .get_transaction(recipient, &receipt.reference)
        .unwrap();
    assert_eq!(debit.reference, credit.reference);
    assert_eq!(debit.direction, TxDirection::Debit);
    assert_eq!(credit.direction, TxDirection::Credit);
    assert_eq!(debit.amount, 50);
    assert_eq!(credit.amount, 50);
    assert_eq!(debit.new_balance, 150);
    assert_eq!(credit.new_balance, 50);
}

#[tokio::test]
async fn qa_self_transfer_rejected_before_any_effect() {
    let engine = engine();
    let owner = funded(&engine, 500).await;
    let journal_before = engine.journal().len();

    let err = engine.transfer(owner, owner, 10).await.unwrap_err();
    assert_eq!(err, WalletError::SelfTransferNotAllowed);

    assert_eq!(engine.balance_of(owner).unwrap().available, 500);
    assert_eq!(engine.journal().len(), journal_before);
}

#[tokio::test]
async fn qa_transfer_insufficient_funds_touches_neither_side() {
    let engine = engine();
    let sender = funded(&engine, 30).await;
    let recipient = funded(&engine, 10).await;
    let journal_before = engine.journal().len();

    let err = engine.transfer(sender, recipient, 31).await.unwrap_err();
    assert_eq!(err, WalletError::InsufficientFunds { available: 30 });

    assert_eq!(engine.balance_of(sender).unwrap().available, 30);
    assert_eq!(engine.balance_of(recipient).unwrap().available, 10);
    assert_eq!(engine.journal().len(), journal_before);
}

#[tokio::test]
async fn qa_conservation_across_transfers() {
    let engine = engine();
    let a = funded(&engine, 1000).await;
    let b = funded(&engine, 500).await;

    engine.transfer(a, b, 250).await.unwrap();
    engine.transfer(b, a, 100).await.unwrap();
    engine.transfer(a, b, 1).await.unwrap();
    // a failed transfer must not move anything either
    assert!(engine.transfer(b, a, 1_000_000).await.is_err());

    let total = engine.balance_of(a).unwrap().available
        + engine.balance_of(b).unwrap().available;
    assert_eq!(total, 1500);
}

#[tokio::test]
async fn qa_transaction_lookup_is_idempotent() {
    let engine = engine();
    let owner = funded(&engine, 42).await;
    let receipt = engine.withdraw(owner, 7).await.unwrap();

    let first = engine.get_transaction(owner, &receipt.reference).unwrap();
    let second = engine.get_transaction(owner, &receipt.reference).unwrap();
    let by_id = engine
        .get_transaction(owner, &receipt.tx_id.to_string())
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first, by_id);
}

#[tokio::test]
async fn qa_list_transactions_newest_first() {
    let engine = engine();
    let owner = engine.open_account();
    for amount in 1..=5u64 {
        engine.deposit(owner, amount).await.unwrap();
    }

    let page1 = engine.list_transactions(owner, 1, 2).unwrap();
    assert_eq!(page1.total, 5);
    assert_eq!(page1.items.len(), 2);
    // newest first: the last deposit (amount 5) leads
    assert_eq!(page1.items[0].amount, 5);
    assert_eq!(page1.items[1].amount, 4);

    let page3 = engine.list_transactions(owner, 3, 2).unwrap();
    assert_eq!(page3.items.len(), 1);
    assert_eq!(page3.items[0].amount, 1);

    // pages are keyed on the insertion sequence, so records keep their
    // position even after more are appended
    engine.deposit(owner, 6).await.unwrap();
    let page3_again = engine.list_transactions(owner, 3, 2).unwrap();
    assert_eq!(page3_again.items.len(), 2);
    assert_eq!(page3_again.items[1].amount, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_bulk_references_are_distinct() {
    let engine = engine();

    // 1000 deposits spread over 10 accounts, run concurrently
    let accounts: Vec<AccountId> = (0..10).map(|_| engine.open_account()).collect();
    let tasks = (0..1000).map(|i| {
        let engine = Arc::clone(&engine);
        let owner = accounts[i % accounts.len()];
        tokio::spawn(async move { engine.deposit(owner, 1).await.unwrap().reference })
    });

    let references: HashSet<String> = join_all(tasks)
        .await
        .into_iter()
        .map(|res| res.unwrap())
        .collect();

    assert_eq!(references.len(), 1000);
    assert_eq!(engine.journal().len(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_concurrent_withdrawals_exactly_one_succeeds() {
    let engine = engine();
    let owner = funded(&engine, 100).await;

    // Two concurrent withdrawals of the full balance: the per-account
    // lock serializes them, so exactly one can see sufficient funds
    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.withdraw(owner, 100).await })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|res| res.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(WalletError::InsufficientFunds { available: 0 })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);

    assert_eq!(engine.balance_of(owner).unwrap().available, 0);
    // one deposit plus exactly one committed withdrawal
    assert_eq!(engine.journal().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn qa_crossed_transfers_do_not_deadlock() {
    let engine = engine();
    let a = funded(&engine, 1000).await;
    let b = funded(&engine, 1000).await;

    // 20 transfers in opposite directions over the same account pair;
    // ordered lock acquisition means none of them can deadlock
    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            tokio::spawn(async move { engine.transfer(from, to, 10).await })
        })
        .collect();

    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    // symmetric flows cancel out; conservation regardless
    let snap_a = engine.balance_of(a).unwrap();
    let snap_b = engine.balance_of(b).unwrap();
    assert_eq!(snap_a.available + snap_b.available, 2000);
    assert_eq!(snap_a.available, 1000);
    assert_eq!(snap_b.available, 1000);
    assert_eq!(engine.journal().len(), 2 + 40);
}

#[tokio::test]
async fn qa_credit_overflow_aborts_transfer_cleanly() {
    let engine = engine();
    let sender = funded(&engine, 100).await;
    let recipient = funded(&engine, u64::MAX).await;
    let journal_before = engine.journal().len();

    // recipient cannot absorb one more unit; the sender's debit must be
    // rolled back before the error surfaces
    let err = engine.transfer(sender, recipient, 1).await.unwrap_err();
    assert!(matches!(err, WalletError::Internal(_)));

    assert_eq!(engine.balance_of(sender).unwrap().available, 100);
    assert_eq!(engine.balance_of(recipient).unwrap().available, u64::MAX);
    assert_eq!(engine.journal().len(), journal_before);
}
