use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Upper bound on tracked clients; new clients beyond it are turned away
const MAX_CLIENTS: usize = 100_000;

/// Fixed-window request counter, one window per client address
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    max_clients: usize,
    state: Mutex<State>,
}

struct State {
    clients: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_max_clients(config, MAX_CLIENTS)
    }

    fn with_max_clients(config: RateLimitConfig, max_clients: usize) -> Self {
        Self {
            limit: config.requests,
            window: config.window(),
            max_clients,
            state: Mutex::new(State {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Record a request from `client`; false once it has used up its window
    pub fn check(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut state = self.state.lock();
        let window = self.window;

        // Expired windows are dropped at most once per window
        if now.saturating_duration_since(state.last_sweep) >= window {
            state.clients.retain(|_, w| now.saturating_duration_since(w.started) < window);
            state.last_sweep = now;
        }

        if !state.clients.contains_key(&client) && state.clients.len() >= self.max_clients {
            return false;
        }

        let entry = state.clients.entry(client).or_insert(Window { started: now, count: 0 });
        if now.saturating_duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state.lock().clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests,
            window_secs: 60,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = limiter(3);
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now + Duration::from_secs(59)));
        assert!(limiter.check_at(ip(1), now + Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let limiter = limiter(0);
        assert!(!limiter.check(ip(1)));
    }

    fn ipv6(n: u32) -> IpAddr {
        let [a, b, c, d] = n.to_be_bytes();
        IpAddr::from([0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, a, b, c, d])
    }

    #[test]
    fn test_many_clients_in_one_window() {
        let limiter = limiter(1);
        let now = Instant::now();
        for n in 0..50_000 {
            assert!(limiter.check_at(ipv6(n), now));
        }
        assert_eq!(limiter.tracked_clients(), 50_000);
    }

    #[test]
    fn test_expired_clients_are_swept() {
        let limiter = limiter(1);
        let now = Instant::now();
        for n in 0..2_000 {
            assert!(limiter.check_at(ipv6(n), now));
        }

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at(ip(1), later));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_client_cap() {
        let limiter = RateLimiter::with_max_clients(
            RateLimitConfig {
                requests: 5,
                window_secs: 60,
            },
            2,
        );
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
        assert!(!limiter.check_at(ip(3), now));
        // Known clients keep their quota
        assert!(limiter.check_at(ip(1), now));
        // Room frees up once old windows expire
        assert!(limiter.check_at(ip(3), now + Duration::from_secs(60)));
    }
}
