use std::{sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::sync::Semaphore;

use galena_p2p_core::handles::{new_connection, BanPeer, BanReason};

#[test]
fn ban_disconnects_and_records_the_reason() {
    let (guard, handle) = new_connection(None);

    handle.ban_peer(BanPeer {
        duration: Duration::from_secs(300),
        reason: BanReason::InvalidData,
    });

    let ban = handle.pending_ban().unwrap();
    assert_eq!(ban.duration, Duration::from_secs(300));
    assert_eq!(ban.reason, BanReason::InvalidData);

    assert!(guard.shutdown_requested().now_or_never().is_some());
    assert!(handle.is_closed());
}

#[test]
fn the_first_ban_wins() {
    let (_guard, handle) = new_connection(None);

    handle.ban_peer(BanPeer {
        duration: Duration::from_secs(300),
        reason: BanReason::StructuralViolation,
    });
    handle.ban_peer(BanPeer {
        duration: Duration::from_secs(600),
        reason: BanReason::InvalidData,
    });

    let ban = handle.pending_ban().unwrap();
    assert_eq!(ban.duration, Duration::from_secs(300));
    assert_eq!(ban.reason, BanReason::StructuralViolation);

    assert!(handle.is_closed());
}

#[test]
fn disconnect_leaves_no_ban_behind() {
    let (_guard, handle) = new_connection(None);

    handle.disconnect();

    assert!(handle.is_closed());
    assert!(handle.pending_ban().is_none());
}

#[test]
fn dropped_guard_closes_the_connection() {
    let semaphore = Arc::new(Semaphore::new(5));
    let (guard, handle) = new_connection(Some(semaphore.try_acquire_owned().unwrap()));

    assert!(!handle.is_closed());
    drop(guard);
    assert!(handle.is_closed());
}
