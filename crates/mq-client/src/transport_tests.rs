//! Tests for the transport boundary types.

use super::*;

#[test]
fn test_zero_means_infinite_from_millis_and_duration() {
    assert_eq!(ReceiveTimeout::from_millis(0), ReceiveTimeout::Infinite);
    assert_eq!(ReceiveTimeout::from(Duration::ZERO), ReceiveTimeout::Infinite);
    assert_eq!(
        ReceiveTimeout::from(Duration::from_millis(5)),
        ReceiveTimeout::from_millis(5)
    );
}

#[test]
fn test_deadline_is_start_plus_duration() {
    let start = Instant::now();
    let timeout = ReceiveTimeout::After(Duration::from_millis(100));

    assert_eq!(
        timeout.deadline(start),
        Some(start + Duration::from_millis(100))
    );
    assert_eq!(ReceiveTimeout::Infinite.deadline(start), None);
}

#[test]
fn test_unrepresentable_deadline_never_expires() {
    let timeout = ReceiveTimeout::After(Duration::MAX);
    assert_eq!(timeout.deadline(Instant::now()), None);
}

#[test]
fn test_access_mode_capabilities() {
    assert!(AccessMode::Send.can_send());
    assert!(!AccessMode::Send.can_receive());
    assert!(AccessMode::Receive.can_receive());
    assert!(!AccessMode::Receive.can_send());
    assert!(AccessMode::SendAndReceive.can_send());
    assert!(AccessMode::SendAndReceive.can_receive());
    assert_eq!(AccessMode::SendAndReceive.value(), 3);
}
