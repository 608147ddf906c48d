// Path: crates/node/src/schedule.rs
//! When a node does its once-per-session work.

use rand::Rng;
use std::time::Duration;
use viper_types::app::Address;

/// Upper bound of the random delay before end-of-session work starts.
pub const MAX_START_DELAY: Duration = Duration::from_secs(5);

/// Whether `height` is this node's turn for once-per-session work.
///
/// The first address byte spreads servicers over the session so they do not
/// all broadcast in the same block. Exactly one height per session qualifies.
pub fn jittered_session_tick(height: u64, address: &Address, blocks_per_session: u64) -> bool {
    if blocks_per_session == 0 {
        return false;
    }
    (height.wrapping_add(u64::from(address.first_byte()))) % blocks_per_session == 1 % blocks_per_session
}

/// A uniformly random delay in `[0, max)`.
pub fn start_delay(max: Duration) -> Duration {
    let millis = max.as_millis() as u64;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(first: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = first;
        Address(bytes)
    }

    #[test]
    fn one_tick_per_session() {
        for first in [0u8, 1, 3, 200, 255] {
            let addr = address(first);
            for session in 0..5u64 {
                let start = session * 4 + 1;
                let ticks = (start..start + 4)
                    .filter(|h| jittered_session_tick(*h, &addr, 4))
                    .count();
                assert_eq!(ticks, 1, "first byte {} session {}", first, session);
            }
        }
    }

    #[test]
    fn zero_first_byte_ticks_on_session_blocks() {
        let addr = address(0);
        assert!(jittered_session_tick(1, &addr, 4));
        assert!(jittered_session_tick(5, &addr, 4));
        assert!(!jittered_session_tick(4, &addr, 4));
    }

    #[test]
    fn first_byte_shifts_the_tick() {
        // (h + 2) % 4 == 1  =>  h ≡ 3 (mod 4)
        let addr = address(2);
        assert!(jittered_session_tick(3, &addr, 4));
        assert!(jittered_session_tick(7, &addr, 4));
        assert!(!jittered_session_tick(5, &addr, 4));
    }

    #[test]
    fn single_block_sessions_tick_every_block() {
        let addr = address(9);
        assert!((1..10).all(|h| jittered_session_tick(h, &addr, 1)));
        assert!(!jittered_session_tick(1, &addr, 0));
    }

    #[test]
    fn delay_is_bounded() {
        for _ in 0..100 {
            assert!(start_delay(MAX_START_DELAY) < MAX_START_DELAY);
        }
        assert_eq!(start_delay(Duration::ZERO), Duration::ZERO);
    }
}
