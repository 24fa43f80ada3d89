use super::*;

#[test]
fn display_matches_as_str() {
    for err in [
        CoreError::UnknownSlot,
        CoreError::UnknownDriver,
        CoreError::NoOpenUdpConnection,
        CoreError::GatewayUnavailable,
        CoreError::StoreUnavailable,
        CoreError::EncodingFailed,
        CoreError::PenaltyApplyFailed,
    ] {
        assert_eq!(err.to_string(), err.as_str());
    }
}
